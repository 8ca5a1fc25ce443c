//! # Quizzer
//!
//! This library provides the live session runtime for hosted multiple
//! choice quizzes. A host opens a session for a quiz, participants join
//! with a short session code, and the server drives every connected client
//! through the questions: it keeps the roster, runs the per-question
//! countdown, scores answers, and pushes the full session state to every
//! client after each change.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod config;
pub mod constants;
pub mod directory;
pub mod game;
pub mod game_id;
pub mod gateway;
mod names;
pub mod quiz;
pub mod scoring;
pub mod session;
pub mod settings;
pub mod watcher;

pub use config::Config;
pub use directory::Directory;
pub use game_id::SessionCode;
