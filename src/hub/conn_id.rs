//! Type-safe connection identifier.

use std::fmt;

/// Unique identifier for a device connection.
///
/// Wraps a UUID v4 generated on accept. Used as the dictionary key in
/// [`super::ConnectionRegistry`] and as the connection discriminator in
/// log output. Two entries in the registry never share an id, so registry
/// uniqueness is uniqueness of live connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(uuid::Uuid);

impl ConnId {
    /// Creates a new random `ConnId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
