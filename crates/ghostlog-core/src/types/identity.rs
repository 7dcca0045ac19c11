//! Dimension entities for message authors and servers.
//!
//! These are "most recently observed" snapshots; the audit store upserts them
//! and links records to them by id.

use serde::{Deserialize, Serialize};

/// A message author as last seen by the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// A server (guild) as last seen by the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
}

impl User {
    /// Create a user with an empty discriminator and avatar
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            discriminator: String::new(),
            avatar_url: String::new(),
        }
    }
}

impl Server {
    /// Create a server reference
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
