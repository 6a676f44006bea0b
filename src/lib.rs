//! Forum resolution and needs-attention workflow.
//!
//! Lets authorized users mark question posts resolved, flags stale unresolved
//! topics in the designated category, and pins those topics for privileged
//! viewers of a category listing.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod error;
pub mod privileges;
pub mod web;
pub mod workflow;
