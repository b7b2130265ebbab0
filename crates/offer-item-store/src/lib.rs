//! `PostgreSQL` implementations of the lifecycle repositories and the
//! catalog adapter.

mod assignee;
pub mod catalog;
mod error;
mod examination;
mod offer_item;
mod questionnaire;
pub mod store;

pub use catalog::PgCatalogAdapter;
pub use store::{PgStore, PgUnitOfWork};
