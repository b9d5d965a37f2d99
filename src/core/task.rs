//! Task data model.
//!
//! A task is a named leaf bound to a scope. The qualified name
//! (`scope.name`) is what users type and what the run log prints.

use crate::core::completion::Leaf;

/// A named unit of work owned by one scope.
#[derive(Debug, Clone)]
pub struct Task {
    /// Name unique within the scope, e.g. `build-javascript`.
    pub name: String,
    /// Scope the task belongs to, e.g. `client`. Empty for shared tasks.
    pub scope: String,
    /// `scope.name`, or just `name` for shared tasks.
    pub qualified_name: String,
    /// One-line description shown in task listings.
    pub description: String,
    /// The work itself.
    pub run: Leaf,
}

impl Task {
    /// Create a task in `scope`.
    pub fn new(scope: &str, name: &str, run: Leaf) -> Self {
        let qualified_name = if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope, name)
        };
        Self {
            name: name.to_string(),
            scope: scope.to_string(),
            qualified_name,
            description: String::new(),
            run,
        }
    }

    /// Create a top-level task that belongs to no scope.
    pub fn shared(name: &str, run: Leaf) -> Self {
        Self::new("", name, run)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}
