//! Engineering goals and their tasks.

mod model;
mod service;

pub use model::{EngineeringGoal, GoalId, GoalTask, TaskId};
pub use service::GoalService;
