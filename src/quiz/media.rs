//! Media references attached to questions
//!
//! The runtime never fetches media. It only carries the reference supplied
//! by the authoring side through to clients, who resolve it themselves.

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Maximum length of a media reference
const MAX_REFERENCE_LENGTH: usize = 2048;

/// An opaque reference (usually a URL) to an image or video shown with a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(transparent)]
pub struct Media(#[garde(length(min = 1, max = MAX_REFERENCE_LENGTH))] String);

impl Media {
    /// Wraps a media reference
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as given by the author
    pub fn reference(&self) -> &str {
        &self.0
    }
}
