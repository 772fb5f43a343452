use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use stockbot_core::Catalog;
use stockbot_discord::CommandRegistry;

#[derive(Clone)]
pub struct HealthState {
    pub catalog: Arc<Catalog>,
    pub registry: Arc<CommandRegistry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub commands: Vec<String>,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.catalog);
    let ready = catalog.status == "ready" && !state.registry.is_empty();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "stockbot-server runtime initialized".to_string(),
        },
        catalog,
        commands: state.registry.names().into_iter().map(str::to_owned).collect(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn catalog_check(catalog: &Catalog) -> HealthCheck {
    let (items, storages) = (catalog.items().len(), catalog.storages().len());
    if items == 0 || storages == 0 {
        return HealthCheck {
            status: "degraded",
            detail: format!("catalog has {items} items and {storages} storages"),
        };
    }
    HealthCheck { status: "ready", detail: format!("{items} items across {storages} storages") }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use stockbot_core::{Catalog, InMemoryCellStore, SheetRef};
    use stockbot_discord::{CommandRegistry, StockCommand};

    use crate::health::{health, HealthState};

    fn state(catalog: &str) -> HealthState {
        let catalog = Arc::new(Catalog::from_toml_str(catalog).expect("catalog"));
        let stock = StockCommand::new(
            catalog.clone(),
            Arc::new(InMemoryCellStore::new()),
            SheetRef::new("sheet-1", "Inventory"),
        );
        HealthState {
            catalog,
            registry: Arc::new(CommandRegistry::new(vec![stock.into_definition()])),
        }
    }

    #[tokio::test]
    async fn health_returns_ready_with_a_populated_catalog() {
        let catalog = r#"
[[items]]
id = "widget"
name = "Widget"
row = 3

[[storages]]
id = "warehouse-a"
name = "Warehouse A"
column = "B"
"#;

        let (status, Json(payload)) = health(State(state(catalog))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.detail, "1 items across 1 storages");
        assert_eq!(payload.commands, vec!["stock".to_string()]);
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_for_an_empty_catalog() {
        let (status, Json(payload)) = health(State(state(""))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_is_degraded_without_commands() {
        let mut state = state("");
        state.registry = Arc::new(CommandRegistry::default());

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(payload.commands.is_empty());
    }
}
