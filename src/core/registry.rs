//! Per-scope task registry.
//!
//! Each scope module builds and returns its own [`TaskRegistry`]; an outer
//! invoker merges several registries by qualified name.

use std::collections::{BTreeMap, HashMap};

use crate::core::completion::Leaf;
use crate::core::task::Task;
use crate::glog_warn;

/// Maps task names to tasks within one scope.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    scope: String,
    tasks: HashMap<String, Task>,
}

impl TaskRegistry {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            tasks: HashMap::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Register `leaf` under `name`. The last registration of a name wins.
    ///
    /// Returns the stored task so it can be composed into other tasks.
    pub fn register(&mut self, name: &str, leaf: Leaf) -> Task {
        self.register_with(name, "", leaf)
    }

    /// Register `leaf` under `name` with a description for listings.
    pub fn register_with(&mut self, name: &str, description: &str, leaf: Leaf) -> Task {
        let task = self.task(name, description, leaf);
        if self.tasks.insert(name.to_string(), task.clone()).is_some() {
            glog_warn!(
                "Task '{}' registered twice; the later definition replaces the earlier one",
                task.qualified_name
            );
        }
        task
    }

    /// Build a task in this scope without registering it.
    ///
    /// Used for internal steps that should log under a qualified name but
    /// not be invocable on their own.
    pub fn task(&self, name: &str, description: &str, leaf: Leaf) -> Task {
        Task::new(&self.scope, name, leaf).with_description(description)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every task keyed by its qualified name.
    pub fn export_qualified(&self) -> BTreeMap<String, Task> {
        self.tasks
            .values()
            .map(|task| (task.qualified_name.clone(), task.clone()))
            .collect()
    }
}
