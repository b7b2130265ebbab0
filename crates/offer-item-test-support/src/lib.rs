//! Shared test doubles and fixtures for the offer item service.

mod catalog;
mod clock;
pub mod fixtures;
mod ids;
mod store;

pub use catalog::{FailingCatalog, StubCatalog};
pub use clock::FixedClock;
pub use ids::SequenceIdGenerator;
pub use store::{FailingStore, InMemoryStore};
