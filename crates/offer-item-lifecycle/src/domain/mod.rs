//! Domain model for the offer item lifecycle.

pub mod assignee;
pub mod catalog;
pub mod commands;
pub mod commission;
pub mod examination;
pub mod ids;
pub mod item;
pub mod offer_item;
pub mod questionnaire;
pub mod repository;
pub mod schedule;
