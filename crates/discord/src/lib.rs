//! Discord interactions interface for stockbot.
//!
//! This crate covers everything that speaks the interactions protocol:
//! - **Verify** (`verify`) - Ed25519 check over `timestamp ++ body`
//! - **Interaction** (`interaction`) - webhook or bus payload decoded into a typed invocation
//! - **Response** (`response`) - pong, deferred and message responses, embed builder
//! - **Commands** (`commands`) - static registry, registration schema, `/stock`
//! - **Webhook** (`webhook`) - edits the deferred reply once a command has finished
//!
//! # Architecture
//!
//! ```text
//! POST /interactions → verify → decode → deferred ack
//!                                  ↓
//!                        CommandRegistry → StockCommand → CellStore
//!                                  ↓
//!                     ReplySink (PATCH @original) ← FollowupMessage
//! ```

pub mod commands;
pub mod interaction;
pub mod response;
pub mod verify;
pub mod webhook;

pub use commands::{CommandDefinition, CommandError, CommandHandler, CommandRegistry, StockCommand};
pub use interaction::{
    DecodeError, Interaction, InteractionKind, InteractionSource, OptionError, OptionValue, User,
};
pub use response::{Embed, EmbedBuilder, FollowupMessage, InteractionResponse};
pub use verify::{AuthInputError, SignatureHeaders, SignatureVerifier};
pub use webhook::{DeliveryError, DiscordRestClient, ReplySink};
