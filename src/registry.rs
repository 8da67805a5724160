use std::collections::HashMap;
use std::fmt;

use tracing::{info, warn};

use crate::error::RegistryError;

/// What a handler sees of the message that invoked it.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub sender_id: i64,
    /// Words after the command name, in order
    pub args: &'a [String],
    /// Chat id when the command came from a multi-party chat
    pub chat_id: Option<i64>,
}

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Silent,
    Text(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    /// The text to send, if any. Empty text counts as no reply.
    pub fn into_text(self) -> Option<String> {
        match self {
            Reply::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

pub type HandlerResult = anyhow::Result<Reply>;

type Handler = Box<dyn Fn(&CommandContext<'_>) -> HandlerResult + Send + Sync>;

/// A registered command
pub struct Command {
    pub name: String,
    pub usage: String,
    handler: Handler,
}

impl Command {
    pub fn invoke(&self, ctx: &CommandContext<'_>) -> HandlerResult {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Registry of bot commands, keyed by name
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. A name already present is replaced.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        usage: impl Into<String>,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&CommandContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name));
        }

        let command = Command {
            name: name.clone(),
            usage: usage.into(),
            handler: Box::new(handler),
        };
        if self.commands.insert(name.clone(), command).is_some() {
            warn!("Command '{}' was already registered, replacing it", name);
        } else {
            info!("Registered command: {}", name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// All commands, sorted by name
    pub fn list(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    /// One `name - usage` line per command, sorted by name.
    pub fn usage_summary(&self) -> String {
        self.list()
            .iter()
            .map(|c| format!("{} - {}", c.name, c.usage))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
