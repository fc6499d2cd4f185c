//! The execute-command service: a name-indexed handler table.

use indexmap::IndexMap;

use crate::{Result, ServiceError};

pub type CommandHandler = Box<dyn Fn(&[String]) -> Result<String>>;

/// Registered commands, executed by name.
#[derive(Default)]
pub struct ExecuteCommand {
    handlers: IndexMap<String, CommandHandler>,
}

impl ExecuteCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: CommandHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn execute(&self, name: &str, arguments: &[String]) -> Result<String> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ServiceError::UnknownCommand(name.to_string()))?;
        handler(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_commands_run() {
        let mut commands = ExecuteCommand::new();
        commands.register(
            "demo.echo",
            Box::new(|args| Ok(args.join(" "))),
        );

        let result = commands
            .execute("demo.echo", &["hello".into(), "there".into()])
            .unwrap();
        assert_eq!(result, "hello there");
    }

    #[test]
    fn unknown_commands_are_errors() {
        let commands = ExecuteCommand::new();
        assert!(matches!(
            commands.execute("ghost", &[]),
            Err(ServiceError::UnknownCommand(_))
        ));
    }
}
