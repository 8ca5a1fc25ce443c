//! Configuration constants for the quiz session runtime
//!
//! This module contains the limits and protocol constants used throughout
//! the runtime to keep accepted quiz content bounded and to give every
//! component the same view of the wire protocol.

/// Quiz definition limits, checked when a quiz is handed to the runtime
pub mod quiz {
    /// Maximum number of questions in a single quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 60;
    /// Maximum length of a question text in characters
    pub const MAX_QUESTION_LENGTH: usize = 90;
    /// Maximum length of an answer option text in characters
    pub const MAX_OPTION_LENGTH: usize = 45;
    /// Maximum length of a question explanation in characters
    pub const MAX_EXPLANATION_LENGTH: usize = 220;
    /// Every question carries exactly this many options
    pub const OPTION_COUNT: usize = 4;
    /// Maximum time limit in seconds for a single question
    pub const MAX_TIME_LIMIT: u64 = 600;
    /// Time limit used when neither the question nor the quiz names one
    pub const DEFAULT_TIME_LIMIT: u64 = 30;
    /// Point value used when a question does not name one
    pub const DEFAULT_POINTS: i64 = 1000;
}

/// Participant limits
pub mod participant {
    /// Maximum number of participants in a single session
    pub const MAX_PLAYER_COUNT: usize = 1000;
    /// Maximum length of a display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Name used when a participant joins without one
    pub const DEFAULT_NAME: &str = "Anonymous";
    /// Color used when a participant joins without a valid one
    pub const DEFAULT_COLOR: &str = "#000000";
}

/// Session code format
pub mod session_code {
    /// Number of characters in a session code
    pub const LENGTH: usize = 4;
    /// Characters a session code is drawn from
    pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    /// Attempts at drawing an unused code before giving up
    pub const MAX_ATTEMPTS: usize = 64;
}

/// Realtime protocol constants
pub mod protocol {
    /// Client identifier reserved for the host connection
    pub const HOST_CLIENT_ID: &str = "host";
    /// WebSocket close code sent when the session code is unknown
    pub const SESSION_NOT_FOUND_CODE: u16 = 4000;
    /// WebSocket close reason sent when the session code is unknown
    pub const SESSION_NOT_FOUND_REASON: &str = "Session not found";
    /// Interval between countdown ticks in milliseconds
    pub const TICK_MILLIS: u64 = 1000;
    /// Frames queued for one connection before further sends are dropped
    pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;
}
