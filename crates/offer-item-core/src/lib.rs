//! Offer Item Core: shared domain abstractions.
//!
//! This crate defines the error type, time and identifier sources, and the
//! paging vocabulary that the lifecycle engine and its adapters share. It
//! contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod id;
pub mod list;
