use std::sync::Arc;

use axum::Router;
use stockbot_core::config::{AppConfig, ConfigError, LoadOptions};
use stockbot_core::{Catalog, CatalogError, CellStore, SheetRef, StoreError};
use stockbot_discord::{
    AuthInputError, CommandRegistry, DeliveryError, DiscordRestClient, ReplySink,
    SignatureVerifier, StockCommand,
};
use stockbot_sheets::SheetsClient;
use thiserror::Error;
use tracing::info;

use crate::bus::{self, BusReceiver};
use crate::front_door::{self, FrontDoorState};
use crate::health::{self, HealthState};
use crate::worker::Worker;

pub struct Application {
    pub config: AppConfig,
    pub catalog: Arc<Catalog>,
    pub registry: Arc<CommandRegistry>,
    pub front_door: FrontDoorState,
    pub worker: Arc<Worker>,
    pub receiver: BusReceiver,
}

impl Application {
    /// Webhook and health routes on one router.
    pub fn router(&self) -> Router {
        front_door::router(self.front_door.clone()).merge(health::router(HealthState {
            catalog: Arc::clone(&self.catalog),
            registry: Arc::clone(&self.registry),
        }))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog could not be loaded: {0}")]
    Catalog(#[from] CatalogError),
    #[error("signature verifier could not be built: {0}")]
    Verifier(#[from] AuthInputError),
    #[error("sheets client could not be built: {0}")]
    Store(#[from] StoreError),
    #[error("reply client could not be built: {0}")]
    Delivery(#[from] DeliveryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Builds the application from an already loaded config, wiring the real
/// Sheets and Discord clients.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let catalog = Catalog::load(&config.catalog.path)?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        path = %config.catalog.path.display(),
        items = catalog.items().len(),
        storages = catalog.storages().len(),
        "catalog loaded"
    );

    let store: Arc<dyn CellStore> = Arc::new(SheetsClient::from_config(&config.sheets)?);
    let replies: Arc<dyn ReplySink> = Arc::new(DiscordRestClient::from_config(&config.discord)?);
    assemble(config, catalog, store, replies)
}

/// Wires every component around the given store and reply sink.
pub fn assemble(
    config: AppConfig,
    catalog: Catalog,
    store: Arc<dyn CellStore>,
    replies: Arc<dyn ReplySink>,
) -> Result<Application, BootstrapError> {
    let catalog = Arc::new(catalog);
    let verifier = Arc::new(SignatureVerifier::from_hex(&config.discord.public_key)?);
    let sheet = SheetRef::new(config.sheets.sheet_id.clone(), config.sheets.tab_name.clone());

    let stock = StockCommand::new(Arc::clone(&catalog), store, sheet);
    let registry = Arc::new(CommandRegistry::new(vec![stock.into_definition()]));

    let (bus, receiver) = bus::channel(config.bus.capacity);
    let worker = Arc::new(Worker::new(Arc::clone(&registry), replies, config.bus.capacity));
    let front_door =
        FrontDoorState { verifier, registry: Arc::clone(&registry), bus: Arc::new(bus) };

    info!(
        event_name = "system.bootstrap.ready",
        commands = ?registry.names(),
        bus_capacity = config.bus.capacity,
        "application assembled"
    );

    Ok(Application { config, catalog, registry, front_door, worker, receiver })
}
