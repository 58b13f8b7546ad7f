use serde::{Deserialize, Serialize};

/// Position of a goal in creation order.
pub type GoalId = usize;

/// Position of a task within its goal.
pub type TaskId = usize;

/// A specific task to be completed for an engineering goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// A technical objective the developer is working toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineeringGoal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<GoalTask>,
}

impl EngineeringGoal {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tasks: Vec::new(),
        }
    }

    /// Number of completed tasks.
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.tasks.is_empty() && self.completed_count() == self.tasks.len()
    }
}
