//! User entity.

use serde::{Deserialize, Serialize};

use crate::repository::{Entity, Named};

/// A person who can own tasks. Names double as a natural key for lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        User { id: 0, name: name.into() }
    }
}

impl Entity for User {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Named for User {
    fn name(&self) -> &str {
        &self.name
    }
}
