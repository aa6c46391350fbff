//! Project entity.
//!
//! Projects group tasks by name. The link is one-directional: a task knows
//! its project id, a project knows nothing about its tasks.

use serde::{Deserialize, Serialize};

use crate::repository::{Entity, Named};

/// A named group of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub description: String,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Project {
            id: 0,
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Entity for Project {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Named for Project {
    fn name(&self) -> &str {
        &self.name
    }
}
