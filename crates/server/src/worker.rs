//! Slow path: one task per bus message, each running a command to completion
//! and editing the deferred reply with the outcome.

use std::sync::Arc;

use stockbot_core::{ApplicationError, InterfaceError};
use stockbot_discord::response::COLOR_RED;
use stockbot_discord::{
    CommandError, CommandRegistry, EmbedBuilder, FollowupMessage, Interaction, InteractionSource,
    ReplySink,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::bus::BusReceiver;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The command's reply was delivered.
    Replied,
    /// The command failed and a failure reply was delivered instead.
    FailedWithReply,
    /// No registered command matched; nothing ran.
    Ignored,
    /// Nothing could be delivered: the payload did not decode or the reply
    /// endpoint refused it.
    Undelivered,
}

pub struct Worker {
    registry: Arc<CommandRegistry>,
    replies: Arc<dyn ReplySink>,
    permits: Arc<Semaphore>,
}

impl Worker {
    /// At most `max_in_flight` messages are processed at once.
    pub fn new(
        registry: Arc<CommandRegistry>,
        replies: Arc<dyn ReplySink>,
        max_in_flight: usize,
    ) -> Self {
        Self { registry, replies, permits: Arc::new(Semaphore::new(max_in_flight.max(1))) }
    }

    /// Consumes the bus until every publisher is gone, then waits for the
    /// in-flight messages to finish.
    pub async fn run(self: Arc<Self>, mut receiver: BusReceiver) {
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                envelope = receiver.recv() => {
                    let Some(envelope) = envelope else { break };
                    // the permit is released when the task ends
                    let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                        break;
                    };
                    let worker = Arc::clone(&self);
                    in_flight.spawn(async move {
                        let outcome = worker.process(&envelope).await;
                        drop(permit);
                        outcome
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join(joined);
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }
        info!(event_name = "worker.stopped", "worker drained and stopped");
    }

    pub async fn process(&self, envelope: &str) -> Outcome {
        let interaction = match Interaction::decode(InteractionSource::Envelope(envelope)) {
            Ok(interaction) => interaction,
            Err(error) => {
                error!(
                    event_name = "worker.decode.failed",
                    error = %error,
                    "bus message did not decode; no reply channel available"
                );
                return Outcome::Undelivered;
            }
        };

        let (message, outcome) = match self.registry.dispatch(&interaction).await {
            Ok(Some(message)) => (message, Outcome::Replied),
            Ok(None) => {
                debug!(
                    event_name = "worker.command.ignored",
                    interaction_id = interaction.id(),
                    command = interaction.command().unwrap_or_default(),
                    "no handler registered"
                );
                return Outcome::Ignored;
            }
            Err(command_error) => {
                error!(
                    event_name = "worker.command.failed",
                    interaction_id = interaction.id(),
                    command = interaction.command().unwrap_or_default(),
                    subcommand = interaction.subcommand().unwrap_or_default(),
                    error = %command_error,
                    "command failed"
                );
                (failure_reply(&interaction, command_error), Outcome::FailedWithReply)
            }
        };

        match self
            .replies
            .edit_original(interaction.application_id(), interaction.token(), &message)
            .await
        {
            Ok(()) => {
                info!(
                    event_name = "worker.reply.delivered",
                    interaction_id = interaction.id(),
                    outcome = ?outcome,
                    "reply delivered"
                );
                outcome
            }
            Err(delivery_error) => {
                warn!(
                    event_name = "worker.reply.failed",
                    interaction_id = interaction.id(),
                    error = %delivery_error,
                    "reply could not be delivered"
                );
                Outcome::Undelivered
            }
        }
    }
}

fn log_join(joined: Result<Outcome, tokio::task::JoinError>) {
    if let Err(join_error) = joined {
        error!(event_name = "worker.task.panicked", error = %join_error, "worker task aborted");
    }
}

/// User-visible message for a command that failed outright. Input mistakes
/// show their reason; store and internal failures show only a safe summary.
pub fn failure_reply(interaction: &Interaction, error: CommandError) -> FollowupMessage {
    let interface = ApplicationError::from(error).into_interface(interaction.id());
    let reason = match &interface {
        InterfaceError::BadRequest { message, .. } => message.clone(),
        InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
            interface.user_message().to_owned()
        }
    };

    let mut embed = EmbedBuilder::new("ERROR")
        .description("The stock command failed with an error.")
        .color(COLOR_RED)
        .field("Reason", reason);
    if !interaction.id().is_empty() {
        embed = embed.field("Reference", interaction.id());
    }
    if let Some(actor) = interaction.actor() {
        embed = embed.author(&actor.username);
    }

    let content = match interaction.actor() {
        Some(actor) => format!("<@{}> {}", actor.id, interface.user_message()),
        None => interface.user_message().to_owned(),
    };
    FollowupMessage::new(content, vec![embed.build()])
}
