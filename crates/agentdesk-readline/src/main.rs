mod commands;
mod helper;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use parking_lot::Mutex;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tokio::runtime::Handle;

use agentdesk_application::ServiceProvider;
use agentdesk_core::agent::{Agent, AgentDefinition, AgentId, AgentService, AgentStatus};
use agentdesk_core::event::DeskEvent;
use agentdesk_core::gateway::GatewayKind;
use agentdesk_core::goal::GoalService;
use agentdesk_core::session::{MessageRole, MessageService};
use agentdesk_core::tracer::TracerService;
use agentdesk_execution::{Inbox, inbox, init_tracing};
use agentdesk_infrastructure::{ConfigStorage, DeskPaths};
use agentdesk_interaction::build_gateways;

use crate::commands::Command;
use crate::helper::CliHelper;

type Prompt = Editor<CliHelper, DefaultHistory>;

#[derive(Parser, Debug)]
#[command(name = "agentdesk", version, about = "Chat with LLM agents from the terminal")]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// The coordinating thread: owns the inbox and renders everything it drains.
struct Repl {
    agents: Arc<dyn AgentService>,
    messages: Arc<dyn MessageService>,
    goals: Arc<dyn GoalService>,
    tracer: Arc<dyn TracerService>,
    inbox: Inbox,
    gateways: Vec<GatewayKind>,
    /// Agents whose reply callback has not run yet.
    awaiting: Arc<Mutex<HashSet<AgentId>>>,
    wait_limit: Duration,
}

/// The main entry point for the AgentDesk readline REPL.
///
/// Gateway round trips run on the tokio worker pool; their results are
/// drained from the inbox and printed before every prompt.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ===== Configuration & logging =====
    let storage = match args.config {
        Some(path) => ConfigStorage::with_path(path),
        None => ConfigStorage::new()?,
    };
    let config = storage.load()?;
    let log_dir = DeskPaths::logs_dir().ok();
    let _log_guard = init_tracing(&config.logging, log_dir.as_deref())?;
    tracing::debug!(path = %storage.path().display(), "Configuration loaded");

    // ===== Backend Initialization =====
    let gateways = build_gateways(&config);
    let gateway_kinds = gateways.kinds();
    let (notifier, inbox) = inbox();
    let provider = ServiceProvider::with_defaults(&config, gateways, notifier, Handle::current());

    let mut repl = Repl {
        agents: provider.agent_service()?,
        messages: provider.message_service()?,
        goals: provider.goal_service()?,
        tracer: provider.tracer_service()?,
        inbox,
        gateways: gateway_kinds,
        awaiting: Arc::new(Mutex::new(HashSet::new())),
        wait_limit: config.dispatch.request_timeout() + Duration::from_secs(5),
    };
    repl.refresh_models(None).await;

    // ===== REPL Setup =====
    let mut rl: Prompt = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== AgentDesk ===".bright_magenta().bold());
    println!(
        "{}",
        "Create an agent with '/new <gateway> <model> <name>', then just type to chat. '/help' lists commands."
            .bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        repl.drain();

        let prompt = match repl.agents.current_agent() {
            Some(agent) => format!("{}> ", agent.name),
            None => ">> ".to_string(),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match trimmed.parse::<Command>() {
                    Ok(Command::Quit) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Ok(command) => repl.handle(&mut rl, command).await,
                    Err(message) => println!("{}", message.yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}

impl Repl {
    /// Runs every queued callback and renders every queued event.
    fn drain(&mut self) {
        self.inbox.try_dispatch(render_event);
    }

    async fn handle(&mut self, rl: &mut Prompt, command: Command) {
        match command {
            Command::Help => print_help(),
            Command::Quit => {}
            Command::Models(kind) => self.refresh_models(kind).await,
            Command::New { gateway, model, name } => self.create_agent(rl, gateway, model, name),
            Command::Agents => self.list_agents(),
            Command::Use(selector) => match self.resolve(&selector) {
                Some(agent) => match self.agents.set_current_agent(agent.id) {
                    Ok(()) => println!("{}", format!("Now talking to {}", agent.name).green()),
                    Err(err) => print_error(&err),
                },
                None => println!("{}", format!("No agent matches '{selector}'").yellow()),
            },
            Command::Remove(selector) => self.remove_agent(selector),
            Command::History => self.print_history(),
            Command::Wait => self.wait_for_reply().await,
            Command::Trace => {
                for event in self.tracer.events() {
                    println!("{} {}", event.timestamp.bright_black(), event.summary());
                }
            }
            Command::Goals => self.print_goals(),
            Command::Goal { title } => match self.goals.create_goal(&title, "") {
                Ok(id) => println!("{}", format!("Goal #{} created", id + 1).green()),
                Err(err) => print_error(&err),
            },
            Command::Task { goal, title } => match self.goals.add_task(goal, &title, "") {
                Ok((_, task)) => println!("{}", format!("Task #{} added to goal #{}", task + 1, goal + 1).green()),
                Err(err) => print_error(&err),
            },
            Command::Done { goal, task } => match self.goals.update_task_status(goal, task, true) {
                Ok(()) => println!("{}", "Task completed".green()),
                Err(err) => print_error(&err),
            },
            Command::Message(text) => self.send(text),
        }
    }

    async fn refresh_models(&self, only: Option<GatewayKind>) {
        let kinds: Vec<GatewayKind> = match only {
            Some(kind) => vec![kind],
            None => self.gateways.clone(),
        };

        for kind in kinds {
            match self.agents.refresh_models(kind).await {
                Ok(models) if models.is_empty() => {
                    println!("{}", format!("{kind}: no models available").yellow())
                }
                Ok(models) => {
                    println!("{}", format!("{kind} models:").bright_yellow());
                    for model in models {
                        println!("  {}", format!("- {model}").yellow());
                    }
                }
                Err(err) => {
                    tracing::warn!(gateway = %kind, error = %err, "Model refresh failed");
                    println!("{}", format!("{kind}: {err}").bright_black());
                }
            }
        }
    }

    fn create_agent(&self, rl: &mut Prompt, gateway: GatewayKind, model: String, name: String) {
        let system_prompt = match rl.readline("system prompt> ") {
            Ok(prompt) => prompt,
            Err(_) => {
                println!("{}", "Agent creation cancelled".yellow());
                return;
            }
        };

        match self
            .agents
            .create_agent(AgentDefinition::new(name, gateway, model, system_prompt))
        {
            Ok(id) => {
                if let Ok(agent) = self.agents.get_agent(id) {
                    println!(
                        "{}",
                        format!("Created {} ({} on {})", agent.name, agent.model, agent.gateway).green()
                    );
                }
            }
            Err(err) => print_error(&err),
        }
    }

    fn list_agents(&self) {
        let agents = self.agents.list_agents();
        if agents.is_empty() {
            println!("{}", "No agents yet".bright_black());
            return;
        }
        let current = self.agents.current_agent().map(|a| a.id);
        for (index, agent) in agents.iter().enumerate() {
            let marker = if Some(agent.id) == current { "*" } else { " " };
            let status = match self.agents.agent_status(agent.id) {
                Ok(AgentStatus::Working) => "working".yellow(),
                _ => "idle".bright_black(),
            };
            println!(
                "{marker} {}. {} [{} / {}] {} ({status})",
                index + 1,
                agent.name.bold(),
                agent.gateway,
                agent.model,
                agent.id.short().bright_black(),
            );
        }
    }

    /// 1-based position or id prefix.
    fn resolve(&self, selector: &str) -> Option<Agent> {
        let agents = self.agents.list_agents();
        if let Ok(position) = selector.parse::<usize>() {
            return position.checked_sub(1).and_then(|i| agents.get(i).cloned());
        }
        agents
            .into_iter()
            .find(|agent| agent.id.to_string().starts_with(selector))
    }

    fn remove_agent(&self, selector: Option<String>) {
        let target = match selector {
            Some(selector) => self.resolve(&selector),
            None => self.agents.current_agent(),
        };
        let Some(agent) = target else {
            println!("{}", "No such agent".yellow());
            return;
        };
        match self.agents.remove_agent(agent.id) {
            Ok(_) => {
                self.awaiting.lock().remove(&agent.id);
            }
            Err(err) => print_error(&err),
        }
    }

    fn print_history(&self) {
        let Some(agent) = self.agents.current_agent() else {
            println!("{}", "No agent selected".yellow());
            return;
        };
        match self.messages.chat_history(agent.id) {
            Ok(history) => {
                for message in history {
                    let line = match message.role {
                        MessageRole::User => format!("> {}", message.content).green(),
                        _ => message.content.bright_blue(),
                    };
                    println!("{line}");
                    if let Some(reason) = &message.failure {
                        println!("  {}", format!("(failed: {reason})").red());
                    }
                }
            }
            Err(err) => print_error(&err),
        }
    }

    fn print_goals(&self) {
        let goals = self.goals.list_goals();
        if goals.is_empty() {
            println!("{}", "No goals yet. Add one with /goal <title>".bright_black());
        }
        for (index, goal) in goals.iter().enumerate() {
            println!(
                "{}. {} ({}/{})",
                index + 1,
                goal.title.bold(),
                goal.completed_count(),
                goal.tasks.len()
            );
            for (task_index, task) in goal.tasks.iter().enumerate() {
                let check = if task.completed { "[x]" } else { "[ ]" };
                println!("   {check} {}. {}", task_index + 1, task.title);
            }
        }
    }

    fn send(&self, text: String) {
        let Some(agent) = self.agents.current_agent() else {
            println!("{}", "No agent selected. Create one with /new".yellow());
            return;
        };

        let name = agent.name.clone();
        let awaiting_ok = Arc::clone(&self.awaiting);
        let awaiting_err = Arc::clone(&self.awaiting);
        let agent_id = agent.id;

        let result = self.messages.send(
            agent_id,
            &text,
            Box::new(move |reply| {
                awaiting_ok.lock().remove(&agent_id);
                print_reply(&name, &reply.content);
            }),
            Box::new(move |err| {
                awaiting_err.lock().remove(&agent_id);
                eprintln!("{}", format!("Error: {err}").red());
            }),
        );

        match result {
            Ok(_) => {
                self.awaiting.lock().insert(agent_id);
                println!("{}", "(waiting for reply; /wait to block)".bright_black());
            }
            Err(err) => print_error(&err),
        }
    }

    /// Blocks the prompt until the current agent's reply has been rendered.
    async fn wait_for_reply(&mut self) {
        let Some(agent) = self.agents.current_agent() else {
            return;
        };
        let awaiting = Arc::clone(&self.awaiting);
        let inbox = &mut self.inbox;

        let waited = tokio::time::timeout(self.wait_limit, async {
            while awaiting.lock().contains(&agent.id) {
                if !inbox.dispatch_next(render_event).await {
                    break;
                }
            }
        })
        .await;

        if waited.is_err() {
            println!("{}", "Still waiting; the reply will show up when it arrives.".yellow());
        }
    }
}

fn render_event(event: &DeskEvent) {
    match event {
        DeskEvent::AgentRemoved { agent_id } => {
            println!("{}", format!("Agent {} removed", agent_id.short()).bright_black());
        }
        DeskEvent::RequestFailed { request_id, .. } => {
            tracing::debug!(%request_id, "Request failed");
        }
        DeskEvent::AgentCreated { .. } | DeskEvent::MessageAppended { .. } => {}
    }
}

fn print_reply(name: &str, content: &str) {
    println!("{}", format!("[{name}]").bright_magenta());
    for line in content.lines() {
        println!("{}", line.bright_blue());
    }
    println!();
}

fn print_error(err: &agentdesk_core::DeskError) {
    eprintln!("{}", format!("Error: {err}").red());
}

fn print_help() {
    let lines = [
        ("/models [gateway]", "refresh and list models"),
        ("/new <gateway> <model> <name>", "create an agent"),
        ("/agents", "list agents"),
        ("/use <n|id>", "switch agent"),
        ("/remove [n|id]", "remove an agent"),
        ("/history", "show the current conversation"),
        ("/wait", "wait for the pending reply"),
        ("/trace", "show LLM call trace"),
        ("/goals, /goal, /task, /done", "track engineering goals"),
        ("/quit", "exit"),
    ];
    for (command, description) in lines {
        println!("  {} {}", format!("{command:<32}").bright_cyan(), description.bright_black());
    }
}
