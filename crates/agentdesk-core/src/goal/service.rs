use super::model::{EngineeringGoal, GoalId, GoalTask, TaskId};
use crate::error::Result;

/// Creation and tracking of engineering goals.
pub trait GoalService: Send + Sync {
    fn create_goal(&self, title: &str, description: &str) -> Result<GoalId>;

    fn get_goal(&self, id: GoalId) -> Result<EngineeringGoal>;

    fn list_goals(&self) -> Vec<EngineeringGoal>;

    fn add_task(&self, goal: GoalId, title: &str, description: &str) -> Result<(GoalTask, TaskId)>;

    fn update_task_status(&self, goal: GoalId, task: TaskId, completed: bool) -> Result<()>;
}
