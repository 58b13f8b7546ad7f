//! Engineering goal tracking.

use agentdesk_core::goal::{EngineeringGoal, GoalId, GoalService, GoalTask, TaskId};
use agentdesk_core::{DeskError, Result};
use parking_lot::RwLock;

/// Keeps goals in memory; ids are positions in creation order.
#[derive(Debug, Default)]
pub struct InMemoryGoalService {
    goals: RwLock<Vec<EngineeringGoal>>,
}

impl InMemoryGoalService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GoalService for InMemoryGoalService {
    fn create_goal(&self, title: &str, description: &str) -> Result<GoalId> {
        if title.trim().is_empty() {
            return Err(DeskError::validation("Goal title must not be empty"));
        }
        let mut goals = self.goals.write();
        goals.push(EngineeringGoal::new(title, description));
        Ok(goals.len() - 1)
    }

    fn get_goal(&self, id: GoalId) -> Result<EngineeringGoal> {
        self.goals
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| DeskError::not_found("Goal", id))
    }

    fn list_goals(&self) -> Vec<EngineeringGoal> {
        self.goals.read().clone()
    }

    fn add_task(&self, goal: GoalId, title: &str, description: &str) -> Result<(GoalTask, TaskId)> {
        if title.trim().is_empty() {
            return Err(DeskError::validation("Task title must not be empty"));
        }
        let mut goals = self.goals.write();
        let entry = goals
            .get_mut(goal)
            .ok_or_else(|| DeskError::not_found("Goal", goal))?;

        let task = GoalTask {
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
        };
        entry.tasks.push(task.clone());
        Ok((task, entry.tasks.len() - 1))
    }

    fn update_task_status(&self, goal: GoalId, task: TaskId, completed: bool) -> Result<()> {
        let mut goals = self.goals.write();
        let entry = goals
            .get_mut(goal)
            .ok_or_else(|| DeskError::not_found("Goal", goal))?;
        let task = entry
            .tasks
            .get_mut(task)
            .ok_or_else(|| DeskError::not_found("Task", format!("{goal}/{task}")))?;
        task.completed = completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_lifecycle() {
        let service = InMemoryGoalService::new();
        let goal = service.create_goal("Ship 1.0", "Cut the release").unwrap();
        let (task, task_id) = service.add_task(goal, "Write changelog", "").unwrap();
        assert_eq!(task.title, "Write changelog");
        assert!(!task.completed);

        service.update_task_status(goal, task_id, true).unwrap();
        let stored = service.get_goal(goal).unwrap();
        assert!(stored.is_complete());
        assert_eq!(service.list_goals().len(), 1);
    }

    #[test]
    fn test_unknown_goal_or_task() {
        let service = InMemoryGoalService::new();
        assert!(service.get_goal(0).unwrap_err().is_not_found());
        assert!(service.add_task(3, "x", "").unwrap_err().is_not_found());

        let goal = service.create_goal("Refactor", "").unwrap();
        assert!(service.update_task_status(goal, 0, true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_titles_are_rejected() {
        let service = InMemoryGoalService::new();
        assert!(service.create_goal(" ", "").unwrap_err().is_validation());
        let goal = service.create_goal("Refactor", "").unwrap();
        assert!(service.add_task(goal, "", "").unwrap_err().is_validation());
    }
}
