//! Typed view over an inbound interaction payload.
//!
//! The same JSON arrives two ways: as the raw webhook body, or relayed
//! through the bus inside a `{"Message": "<json>"}` envelope. Both decode to
//! one [`Interaction`], whose options from the command and its subcommand are
//! flattened into a single name-to-value table.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

pub const OPTION_SUB_COMMAND: u8 = 1;
pub const OPTION_SUB_COMMAND_GROUP: u8 = 2;
pub const OPTION_STRING: u8 = 3;
pub const OPTION_INTEGER: u8 = 4;
pub const OPTION_BOOLEAN: u8 = 5;
pub const OPTION_NUMBER: u8 = 10;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("interaction payload is empty")]
    MissingBody,
    #[error("interaction payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope carries neither a `body` nor a `Message` field")]
    UnsupportedEnvelope,
    #[error("option `{name}` has a value that does not match its declared type {kind}")]
    InvalidOption { name: String, kind: u8 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("option `{0}` not found")]
    NotFound(String),
    #[error("option `{name}` is {found}, expected {expected}")]
    TypeMismatch { name: String, expected: &'static str, found: &'static str },
    #[error("interaction is not an application command")]
    NotACommand,
}

/// Where a payload came from, before unwrapping.
#[derive(Clone, Copy, Debug)]
pub enum InteractionSource<'a> {
    /// Raw webhook body, byte for byte.
    Webhook(&'a [u8]),
    /// A relayed envelope: `{"Message": "<json>"}` from the bus, or a gateway
    /// event of the form `{"body": "<json>"}`.
    Envelope(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    Unsupported(u8),
}

impl From<u8> for InteractionKind {
    fn from(code: u8) -> Self {
        match code {
            INTERACTION_PING => Self::Ping,
            INTERACTION_APPLICATION_COMMAND => Self::ApplicationCommand,
            other => Self::Unsupported(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// Users, channels, roles, mentionables and attachments, by snowflake id.
    Reference { kind: u8, id: String },
}

impl OptionValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Reference { .. } => "reference",
        }
    }

    fn decode(name: &str, kind: u8, value: &Value) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidOption { name: name.to_owned(), kind };
        match kind {
            OPTION_STRING => {
                value.as_str().map(|text| Self::String(text.to_owned())).ok_or_else(invalid)
            }
            OPTION_INTEGER => value.as_i64().map(Self::Integer).ok_or_else(invalid),
            OPTION_NUMBER => value.as_f64().map(Self::Number).ok_or_else(invalid),
            OPTION_BOOLEAN => value.as_bool().map(Self::Boolean).ok_or_else(invalid),
            _ => match value {
                Value::String(id) => Ok(Self::Reference { kind, id: id.clone() }),
                Value::Number(id) => Ok(Self::Reference { kind, id: id.to_string() }),
                _ => Err(invalid()),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    application_id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    token: String,
    #[serde(default)]
    data: Option<RawCommandData>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct RawCommandData {
    name: String,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(default)]
    user: Option<User>,
}

/// One decoded invocation. Built once per request and never mutated.
#[derive(Clone, Debug)]
pub struct Interaction {
    id: String,
    application_id: String,
    token: String,
    kind: InteractionKind,
    command: Option<String>,
    subcommand: Option<String>,
    options: HashMap<String, OptionValue>,
    actor: Option<User>,
    raw: Value,
}

impl Interaction {
    pub fn decode(source: InteractionSource<'_>) -> Result<Self, DecodeError> {
        match source {
            InteractionSource::Webhook(body) => {
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Err(DecodeError::MissingBody);
                }
                Self::from_value(serde_json::from_slice(body)?)
            }
            InteractionSource::Envelope(envelope) => {
                let envelope: Value = serde_json::from_str(envelope)?;
                let inner = unwrap_envelope(&envelope)?;
                if inner.trim().is_empty() {
                    return Err(DecodeError::MissingBody);
                }
                Self::from_value(serde_json::from_str(inner)?)
            }
        }
    }

    pub fn from_value(raw: Value) -> Result<Self, DecodeError> {
        let parsed = RawInteraction::deserialize(&raw)?;
        let kind = InteractionKind::from(parsed.kind);

        let mut command = None;
        let mut subcommand = None;
        let mut options = HashMap::new();
        if let (InteractionKind::ApplicationCommand, Some(data)) = (kind, parsed.data.as_ref()) {
            command = Some(data.name.clone());

            if let Some(first) = data.options.first().filter(|o| o.kind == OPTION_SUB_COMMAND) {
                subcommand = Some(first.name.clone());
                collect_values(&first.options, &mut options)?;
            }
            // top-level values win over nested ones on a name collision
            collect_values(&data.options, &mut options)?;
        }

        let actor = parsed.member.and_then(|member| member.user).or(parsed.user);

        Ok(Self {
            id: parsed.id,
            application_id: parsed.application_id,
            token: parsed.token,
            kind,
            command,
            subcommand,
            options,
            actor,
            raw,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Guild member's user, or the invoking user for direct messages.
    pub fn actor(&self) -> Option<&User> {
        self.actor.as_ref()
    }

    pub fn command(&self) -> Result<&str, OptionError> {
        self.command.as_deref().ok_or(OptionError::NotACommand)
    }

    /// Name of the first top-level option when it is a subcommand.
    pub fn subcommand(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn get_string(&self, name: &str) -> Result<&str, OptionError> {
        match self.require(name)? {
            OptionValue::String(value) => Ok(value),
            other => Err(mismatch(name, "string", other)),
        }
    }

    pub fn get_integer(&self, name: &str) -> Result<i64, OptionError> {
        match self.require(name)? {
            OptionValue::Integer(value) => Ok(*value),
            other => Err(mismatch(name, "integer", other)),
        }
    }

    fn require(&self, name: &str) -> Result<&OptionValue, OptionError> {
        self.options.get(name).ok_or_else(|| OptionError::NotFound(name.to_owned()))
    }
}

fn mismatch(name: &str, expected: &'static str, found: &OptionValue) -> OptionError {
    OptionError::TypeMismatch { name: name.to_owned(), expected, found: found.type_name() }
}

fn collect_values(
    options: &[RawOption],
    into: &mut HashMap<String, OptionValue>,
) -> Result<(), DecodeError> {
    for option in options {
        if matches!(option.kind, OPTION_SUB_COMMAND | OPTION_SUB_COMMAND_GROUP) {
            continue;
        }
        if let Some(value) = option.value.as_ref() {
            let decoded = OptionValue::decode(&option.name, option.kind, value)?;
            into.insert(option.name.clone(), decoded);
        }
    }
    Ok(())
}

fn unwrap_envelope(envelope: &Value) -> Result<&str, DecodeError> {
    ["Message", "body"]
        .iter()
        .find_map(|field| envelope.get(*field))
        .map(|inner| inner.as_str().ok_or(DecodeError::MissingBody))
        .unwrap_or(Err(DecodeError::UnsupportedEnvelope))
}
