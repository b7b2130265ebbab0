//! Offer Item Lifecycle: campaign configuration and assignee progress.
//!
//! Responsible for the invariants of an offer campaign, the stage machine
//! each participating blogger moves through, and the transactional
//! orchestration that applies single and bulk transitions.

pub mod application;
pub mod domain;
