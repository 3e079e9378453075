//! Lookup of user accounts owned by the identity provider.
//!
//! The election store only keeps user ids. When it needs a display name
//! (person candidates cache one as their title) it asks a `UserDirectory`.
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// First and last name separated by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns `Ok(None)` when the id is unknown to the directory, and
    /// `Error::Directory` when the directory itself cannot answer.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
}

#[async_trait]
impl UserDirectory for HashMap<UserId, User> {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.get(&id).cloned())
    }
}
