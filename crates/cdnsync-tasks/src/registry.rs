use std::collections::HashMap;
use std::sync::Arc;

use crate::sync::SyncTask;
use crate::task::Task;

/// Name-to-task table, filled once at startup.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every task shipped with the server.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SyncTask::NAME, SyncTask);
        registry
    }

    /// Registers `task` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, task: impl Task + 'static) {
        self.tasks.insert(name.into(), Arc::new(task));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}
