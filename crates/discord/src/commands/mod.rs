//! Static command table and the schema each command registers with.
//!
//! The registry is built once at startup from an ordered list; lookup is a
//! linear scan on name. There is no runtime registration.

pub mod stock;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use stockbot_core::{ApplicationError, DomainError, StoreError};
use thiserror::Error;

use crate::interaction::{
    Interaction, OptionError, OPTION_INTEGER, OPTION_STRING, OPTION_SUB_COMMAND,
};
use crate::response::FollowupMessage;

pub use stock::StockCommand;

const CHAT_INPUT: u8 = 1;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("interaction carries neither a guild member nor a user")]
    MissingActor,
}

impl From<CommandError> for ApplicationError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::Domain(error) => Self::Domain(error),
            CommandError::Store(error) => Self::Store(error),
            CommandError::Option(error) => Self::Input(error.to_string()),
            CommandError::MissingActor => Self::Input(CommandError::MissingActor.to_string()),
        }
    }
}

/// Runs one command to completion and returns the message that replaces the
/// deferred acknowledgment.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, interaction: &Interaction) -> Result<FollowupMessage, CommandError>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    fn new(kind: u8, name: &str, description: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            description: description.to_owned(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn subcommand(name: &str, description: &str, options: Vec<CommandOption>) -> Self {
        Self { options, ..Self::new(OPTION_SUB_COMMAND, name, description) }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(OPTION_STRING, name, description)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(OPTION_INTEGER, name, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn string_choices<'a, I>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.choices.extend(choices.into_iter().map(|(name, value)| OptionChoice {
            name: name.to_owned(),
            value: serde_json::Value::from(value),
        }));
        self
    }
}

/// Registration schema, in the shape the bulk-overwrite endpoint accepts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandMetadata {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandMetadata {
    pub fn chat_input(name: &str, description: &str, options: Vec<CommandOption>) -> Self {
        Self {
            kind: CHAT_INPUT,
            name: name.to_owned(),
            description: description.to_owned(),
            options,
        }
    }
}

#[derive(Clone)]
pub struct CommandDefinition {
    pub metadata: CommandMetadata,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn new(metadata: CommandMetadata, handler: Arc<dyn CommandHandler>) -> Self {
        Self { metadata, handler }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    definitions: Vec<CommandDefinition>,
}

impl CommandRegistry {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        Self { definitions }
    }

    /// First definition registered under `name`.
    pub fn find(&self, name: &str) -> Option<&CommandDefinition> {
        self.definitions.iter().find(|definition| definition.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(CommandDefinition::name).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn registration_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        let metadata =
            self.definitions.iter().map(|definition| &definition.metadata).collect::<Vec<_>>();
        serde_json::to_value(metadata)
    }

    /// `Ok(None)` when no command matches; nothing runs in that case.
    pub async fn dispatch(
        &self,
        interaction: &Interaction,
    ) -> Result<Option<FollowupMessage>, CommandError> {
        let Some(definition) = self.find(interaction.command()?) else {
            return Ok(None);
        };
        definition.handler.handle(interaction).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::{
        CommandDefinition, CommandError, CommandHandler, CommandMetadata, CommandOption,
        CommandRegistry,
    };
    use crate::interaction::{Interaction, OptionError};
    use crate::response::FollowupMessage;

    struct Counting {
        label: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Counting {
        async fn handle(&self, _: &Interaction) -> Result<FollowupMessage, CommandError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FollowupMessage::new(self.label, Vec::new()))
        }
    }

    fn definition(name: &str, handler: Arc<Counting>) -> CommandDefinition {
        CommandDefinition::new(CommandMetadata::chat_input(name, "test", Vec::new()), handler)
    }

    fn invocation(name: &str) -> Interaction {
        Interaction::from_value(json!({ "type": 2, "data": { "name": name } })).expect("decode")
    }

    #[tokio::test]
    async fn dispatch_runs_only_the_first_match() {
        let first = Arc::new(Counting { label: "first", calls: AtomicUsize::new(0) });
        let second = Arc::new(Counting { label: "second", calls: AtomicUsize::new(0) });
        let registry = CommandRegistry::new(vec![
            definition("stock", first.clone()),
            definition("stock", second.clone()),
        ]);

        let reply = registry.dispatch(&invocation("stock")).await.expect("dispatch");

        assert_eq!(reply.map(|message| message.content), Some("first".to_owned()));
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_commands_run_nothing() {
        let handler = Arc::new(Counting { label: "stock", calls: AtomicUsize::new(0) });
        let registry = CommandRegistry::new(vec![definition("stock", handler.clone())]);

        let reply = registry.dispatch(&invocation("inventory")).await.expect("dispatch");
        assert!(reply.is_none());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);

        let ping = Interaction::from_value(json!({ "type": 1 })).expect("decode");
        assert!(matches!(
            registry.dispatch(&ping).await,
            Err(CommandError::Option(OptionError::NotACommand))
        ));
    }

    #[test]
    fn registration_payload_lists_commands_in_order() {
        let registry = CommandRegistry::new(vec![
            CommandDefinition::new(
                CommandMetadata::chat_input(
                    "stock",
                    "Stock Inventory",
                    vec![CommandOption::subcommand(
                        "edit",
                        "Edit",
                        vec![
                            CommandOption::string("item", "Item")
                                .required()
                                .string_choices([("Widget", "widget")]),
                            CommandOption::integer("quantity", "Quantity"),
                        ],
                    )],
                ),
                Arc::new(Counting { label: "a", calls: AtomicUsize::new(0) }),
            ),
            definition("audit", Arc::new(Counting { label: "b", calls: AtomicUsize::new(0) })),
        ]);

        assert_eq!(registry.names(), vec!["stock", "audit"]);
        assert_eq!(
            registry.registration_payload().expect("payload"),
            json!([
                {
                    "type": 1,
                    "name": "stock",
                    "description": "Stock Inventory",
                    "options": [{
                        "type": 1,
                        "name": "edit",
                        "description": "Edit",
                        "options": [
                            {
                                "type": 3,
                                "name": "item",
                                "description": "Item",
                                "required": true,
                                "choices": [{ "name": "Widget", "value": "widget" }]
                            },
                            { "type": 4, "name": "quantity", "description": "Quantity" }
                        ]
                    }]
                },
                { "type": 1, "name": "audit", "description": "test" }
            ])
        );
    }
}
