//! Client identifier handling.

use std::fmt;

use crate::error::{CornstandError, Result};

/// Opaque identifier of a purchasing client.
///
/// Only emptiness is checked; the value is otherwise used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Validate a caller-supplied identifier.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        // Whitespace-only ids count as missing
        if raw.trim().is_empty() {
            return Err(CornstandError::Validation("clientId is required".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
