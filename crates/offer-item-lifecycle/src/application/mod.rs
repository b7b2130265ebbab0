//! Application layer: command and query handlers.

pub mod assignee_handlers;
pub mod examination_handlers;
pub mod offer_item_handlers;
pub mod query_handlers;
