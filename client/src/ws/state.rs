//! Connection lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one named connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// Transport is being established.
    Connecting,
    /// Transport is open and writable.
    Open,
    /// An explicit disconnect is tearing the transport down.
    Closing,
    /// No live transport.
    #[default]
    Closed,
}

impl ConnectionState {
    /// Returns true if a transport is live or being established.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Returns true if the connection is open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Open => write!(f, "OPEN"),
            Self::Closing => write!(f, "CLOSING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}
