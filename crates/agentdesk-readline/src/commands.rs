//! REPL command parsing.

use std::str::FromStr;

use agentdesk_core::gateway::GatewayKind;
use agentdesk_core::goal::{GoalId, TaskId};

pub const COMMANDS: &[&str] = &[
    "/help", "/models", "/new", "/agents", "/use", "/remove", "/history", "/wait", "/trace",
    "/goals", "/goal", "/task", "/done", "/quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    /// Refresh one gateway, or all when `None`.
    Models(Option<GatewayKind>),
    New {
        gateway: GatewayKind,
        model: String,
        name: String,
    },
    Agents,
    /// Select by 1-based position or id prefix.
    Use(String),
    Remove(Option<String>),
    History,
    Wait,
    Trace,
    Goals,
    Goal { title: String },
    Task { goal: GoalId, title: String },
    Done { goal: GoalId, task: TaskId },
    /// Plain text for the current agent.
    Message(String),
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Command::Message(line.to_string()));
        }

        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match head {
            "/help" => Ok(Command::Help),
            "/quit" | "/exit" => Ok(Command::Quit),
            "/models" if rest.is_empty() => Ok(Command::Models(None)),
            "/models" => parse_gateway(rest).map(|g| Command::Models(Some(g))),
            "/new" => {
                let mut parts = rest.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(gateway), Some(model), Some(name)) if !name.trim().is_empty() => {
                        Ok(Command::New {
                            gateway: parse_gateway(gateway)?,
                            model: model.to_string(),
                            name: name.trim().to_string(),
                        })
                    }
                    _ => Err("Usage: /new <gateway> <model> <name>".into()),
                }
            }
            "/agents" => Ok(Command::Agents),
            "/use" if !rest.is_empty() => Ok(Command::Use(rest.to_string())),
            "/use" => Err("Usage: /use <number|id>".into()),
            "/remove" => Ok(Command::Remove((!rest.is_empty()).then(|| rest.to_string()))),
            "/history" => Ok(Command::History),
            "/wait" => Ok(Command::Wait),
            "/trace" => Ok(Command::Trace),
            "/goals" => Ok(Command::Goals),
            "/goal" if !rest.is_empty() => Ok(Command::Goal {
                title: rest.to_string(),
            }),
            "/goal" => Err("Usage: /goal <title>".into()),
            "/task" => {
                let (goal, title) = rest.split_once(' ').ok_or("Usage: /task <goal#> <title>")?;
                Ok(Command::Task {
                    goal: parse_position(goal)?,
                    title: title.trim().to_string(),
                })
            }
            "/done" => {
                let (goal, task) = rest.split_once(' ').ok_or("Usage: /done <goal#> <task#>")?;
                Ok(Command::Done {
                    goal: parse_position(goal)?,
                    task: parse_position(task.trim())?,
                })
            }
            other => Err(format!("Unknown command: {other}")),
        }
    }
}

fn parse_gateway(value: &str) -> Result<GatewayKind, String> {
    GatewayKind::from_str(value.trim()).map_err(|_| format!("Unknown gateway '{value}' (try OpenAI or Ollama)"))
}

/// Parses a 1-based position into a 0-based index.
fn parse_position(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Expected a positive number, got '{value}'")),
    }
}
