//! Quiz definitions handed to the runtime
//!
//! A quiz is authored elsewhere and arrives once, at session creation.
//! These modules describe its shape, validate it at the handoff boundary,
//! and never change it afterwards.

pub mod config;
pub mod media;
