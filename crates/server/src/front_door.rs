//! Webhook entry point. Everything here must finish well inside the platform's
//! response deadline, so no store I/O happens on this path: commands are
//! published to the bus and acknowledged with a deferred response.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use stockbot_discord::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use stockbot_discord::{
    CommandRegistry, Interaction, InteractionKind, InteractionResponse, InteractionSource,
    SignatureHeaders, SignatureVerifier,
};
use tracing::{debug, error, info, warn};

use crate::bus::{BusMessage, MessageBus};

/// HTTP status plus JSON body returned to the gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayReply {
    pub status: StatusCode,
    pub body: Value,
}

impl GatewayReply {
    pub fn success(response: &InteractionResponse) -> Self {
        let body = serde_json::to_value(response)
            .unwrap_or_else(|error| json!({ "error": error.to_string() }));
        Self { status: StatusCode::OK, body }
    }

    pub fn pong() -> Self {
        Self::success(&InteractionResponse::pong())
    }

    pub fn deferred() -> Self {
        Self::success(&InteractionResponse::deferred())
    }

    pub fn none() -> Self {
        Self::success(&InteractionResponse::no_handler())
    }

    pub fn client_error(message: impl std::fmt::Display) -> Self {
        Self::error(StatusCode::BAD_REQUEST, message)
    }

    pub fn auth_error(message: impl std::fmt::Display) -> Self {
        Self::error(StatusCode::UNAUTHORIZED, message)
    }

    pub fn server_error(message: impl std::fmt::Display) -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn error(status: StatusCode, message: impl std::fmt::Display) -> Self {
        Self { status, body: json!({ "error": message.to_string() }) }
    }
}

impl IntoResponse for GatewayReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Clone)]
pub struct FrontDoorState {
    pub verifier: Arc<SignatureVerifier>,
    pub registry: Arc<CommandRegistry>,
    pub bus: Arc<dyn MessageBus>,
}

pub fn router(state: FrontDoorState) -> Router {
    Router::new().route("/interactions", post(interactions)).with_state(state)
}

pub async fn interactions(
    State(state): State<FrontDoorState>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayReply {
    handle(&state, &headers, &body).await
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub async fn handle(state: &FrontDoorState, headers: &HeaderMap, body: &[u8]) -> GatewayReply {
    let signature_headers = SignatureHeaders {
        signature: header(headers, SIGNATURE_HEADER),
        timestamp: header(headers, TIMESTAMP_HEADER),
    };
    match state.verifier.is_verified(signature_headers, body) {
        Ok(true) => {}
        Ok(false) => {
            warn!(event_name = "front_door.auth.rejected", "request signature did not verify");
            return GatewayReply::auth_error("invalid request signature");
        }
        Err(error) => {
            warn!(event_name = "front_door.auth.rejected", error = %error, "unverifiable request");
            return GatewayReply::auth_error(error);
        }
    }

    let decoded = Interaction::decode(InteractionSource::Webhook(body))
        .map_err(|error| error.to_string())
        .and_then(|interaction| match std::str::from_utf8(body) {
            Ok(raw) => Ok((interaction, raw)),
            Err(error) => Err(error.to_string()),
        });
    let (interaction, raw) = match decoded {
        Ok(decoded) => decoded,
        Err(error) => {
            warn!(event_name = "front_door.decode.failed", error = %error, "undecodable payload");
            return GatewayReply::none();
        }
    };

    match interaction.kind() {
        InteractionKind::Ping => {
            debug!(event_name = "front_door.ping", "answered ping");
            GatewayReply::pong()
        }
        InteractionKind::ApplicationCommand => {
            let known =
                interaction.command().ok().filter(|name| state.registry.find(name).is_some());
            let Some(command) = known else {
                info!(
                    event_name = "front_door.command.unknown",
                    interaction_id = interaction.id(),
                    command = interaction.command().unwrap_or_default(),
                    "no handler for command"
                );
                return GatewayReply::none();
            };

            let message = BusMessage::new(raw);
            let message_id = message.id;
            if let Err(error) = state.bus.publish(message).await {
                error!(
                    event_name = "front_door.bus.publish_failed",
                    interaction_id = interaction.id(),
                    error = %error,
                    "could not hand interaction to worker"
                );
                return GatewayReply::server_error(error);
            }

            info!(
                event_name = "front_door.command.deferred",
                interaction_id = interaction.id(),
                command,
                subcommand = interaction.subcommand().unwrap_or_default(),
                message_id = %message_id,
                "command deferred to worker"
            );
            GatewayReply::deferred()
        }
        InteractionKind::Unsupported(code) => {
            info!(
                event_name = "front_door.interaction.unsupported",
                interaction_id = interaction.id(),
                interaction_type = code,
                "unsupported interaction type"
            );
            GatewayReply::none()
        }
    }
}
