//! `/stock edit` and `/stock move`.
//!
//! Both paths resolve catalog ids to one cell per location, read the current
//! quantities, and only write once every guard has passed. A blocked guard is
//! an ordinary reply, not an error. Writes for a move go source first, then
//! destination, with no compensation if the second write fails.

use std::sync::Arc;

use async_trait::async_trait;
use stockbot_core::stock::{check_move_request, plan_edit, plan_move, read_quantity};
use stockbot_core::{
    Catalog, CellAddress, CellStore, DomainError, EditPlan, GuardViolation, MovePlan, SheetRef,
    Verdict,
};
use tracing::{error, info};

use super::{CommandDefinition, CommandError, CommandHandler, CommandMetadata, CommandOption};
use crate::interaction::{Interaction, User};
use crate::response::{Embed, EmbedBuilder, FollowupMessage, COLOR_LIME_GREEN, COLOR_RED};

pub const COMMAND_NAME: &str = "stock";

const OPTION_ITEM: &str = "item";
const OPTION_LOCATION: &str = "location";
const OPTION_OLD_LOCATION: &str = "old-location";
const OPTION_NEW_LOCATION: &str = "new-location";
const OPTION_QUANTITY: &str = "quantity";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockSubcommand {
    Edit,
    Move,
}

impl StockSubcommand {
    pub fn parse(name: Option<&str>) -> Result<Self, DomainError> {
        match name {
            Some("edit") => Ok(Self::Edit),
            Some("move") => Ok(Self::Move),
            other => Err(DomainError::UnknownSubcommand(other.unwrap_or("<none>").to_owned())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Move => "move",
        }
    }
}

pub struct StockCommand {
    catalog: Arc<Catalog>,
    store: Arc<dyn CellStore>,
    sheet: SheetRef,
}

impl StockCommand {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn CellStore>, sheet: SheetRef) -> Self {
        Self { catalog, store, sheet }
    }

    pub fn into_definition(self) -> CommandDefinition {
        let metadata = metadata(&self.catalog);
        CommandDefinition::new(metadata, Arc::new(self))
    }

    async fn read(&self, cell: &CellAddress) -> Result<i64, CommandError> {
        let value = self.store.get_cell(&self.sheet, cell).await?;
        Ok(read_quantity(cell, value.as_ref())?)
    }

    async fn edit(&self, interaction: &Interaction, actor: &User) -> Result<Embed, CommandError> {
        let item_id = interaction.get_string(OPTION_ITEM)?;
        let location_id = interaction.get_string(OPTION_LOCATION)?;
        let delta = interaction.get_integer(OPTION_QUANTITY)?;

        let storage = self.catalog.find_storage(location_id)?;
        let item = self.catalog.find_item(item_id)?;
        let cell = CellAddress::for_stock(item, storage);

        let old_quantity = self.read(&cell).await?;
        let plan = match plan_edit(old_quantity, delta)? {
            Verdict::Proceed(plan) => plan,
            Verdict::Blocked(violation) => {
                info!(
                    event_name = "command.stock.edit_blocked",
                    interaction_id = interaction.id(),
                    cell = %cell,
                    delta,
                    "edit blocked by guard"
                );
                let reason = guard_reason(&violation, &item.name, &storage.name, "Edited");
                return Ok(error_embed(&reason, actor));
            }
        };

        self.store.update_cell(&self.sheet, &cell, plan.new_quantity).await?;
        info!(
            event_name = "command.stock.edited",
            interaction_id = interaction.id(),
            cell = %cell,
            old_quantity = plan.old_quantity,
            new_quantity = plan.new_quantity,
            "stock edited"
        );
        Ok(edit_embed(&item.name, &storage.name, &plan, actor))
    }

    async fn move_stock(
        &self,
        interaction: &Interaction,
        actor: &User,
    ) -> Result<Embed, CommandError> {
        let item_id = interaction.get_string(OPTION_ITEM)?;
        let source_id = interaction.get_string(OPTION_OLD_LOCATION)?;
        let destination_id = interaction.get_string(OPTION_NEW_LOCATION)?;
        let quantity = interaction.get_integer(OPTION_QUANTITY)?;

        let item = self.catalog.find_item(item_id)?;
        let source = self.catalog.find_storage(source_id)?;
        let destination = self.catalog.find_storage(destination_id)?;

        if let Some(violation) = check_move_request(&source.id, &destination.id, quantity) {
            info!(
                event_name = "command.stock.move_blocked",
                interaction_id = interaction.id(),
                source = source_id,
                destination = destination_id,
                quantity,
                "move rejected before reading the store"
            );
            let reason = guard_reason(&violation, &item.name, &source.name, "Moved");
            return Ok(error_embed(&reason, actor));
        }

        let source_cell = CellAddress::for_stock(item, source);
        let destination_cell = CellAddress::for_stock(item, destination);
        let source_old = self.read(&source_cell).await?;
        let destination_old = self.read(&destination_cell).await?;

        let plan = match plan_move(source_old, destination_old, quantity)? {
            Verdict::Proceed(plan) => plan,
            Verdict::Blocked(violation) => {
                info!(
                    event_name = "command.stock.move_blocked",
                    interaction_id = interaction.id(),
                    cell = %source_cell,
                    quantity,
                    "move blocked by guard"
                );
                let reason = guard_reason(&violation, &item.name, &source.name, "Moved");
                return Ok(error_embed(&reason, actor));
            }
        };

        self.store.update_cell(&self.sheet, &source_cell, plan.source_new).await?;
        if let Err(store_error) =
            self.store.update_cell(&self.sheet, &destination_cell, plan.destination_new).await
        {
            error!(
                event_name = "command.stock.move_partially_applied",
                interaction_id = interaction.id(),
                source_cell = %source_cell,
                source_written = plan.source_new,
                destination_cell = %destination_cell,
                destination_intended = plan.destination_new,
                error = %store_error,
                "source written but destination write failed"
            );
            return Err(store_error.into());
        }

        info!(
            event_name = "command.stock.moved",
            interaction_id = interaction.id(),
            source_cell = %source_cell,
            destination_cell = %destination_cell,
            quantity,
            "stock moved"
        );
        Ok(move_embed(&item.name, &source.name, &destination.name, &plan, actor))
    }
}

#[async_trait]
impl CommandHandler for StockCommand {
    async fn handle(&self, interaction: &Interaction) -> Result<FollowupMessage, CommandError> {
        let actor = interaction.actor().ok_or(CommandError::MissingActor)?;
        let subcommand = StockSubcommand::parse(interaction.subcommand())?;

        let embed = match subcommand {
            StockSubcommand::Edit => self.edit(interaction, actor).await?,
            StockSubcommand::Move => self.move_stock(interaction, actor).await?,
        };
        Ok(FollowupMessage::new(used_command_text(actor, subcommand), vec![embed]))
    }
}

pub fn used_command_text(actor: &User, subcommand: StockSubcommand) -> String {
    format!("<@{}> used the `/{COMMAND_NAME} {}` command", actor.id, subcommand.as_str())
}

fn guard_reason(
    violation: &GuardViolation,
    item: &str,
    location: &str,
    change_label: &str,
) -> String {
    match violation {
        GuardViolation::SameLocation => format!(
            "Did not update `{item}` since storage is the same, should be different storages.\n\
             Location = `{location}`"
        ),
        GuardViolation::NegativeMoveQuantity { quantity } => format!(
            "Did not update `{item}` since moved quantity is negative, should always be \
             positive.\nMoved = `{quantity}`"
        ),
        GuardViolation::NegativeResult { current, change, would_be } => format!(
            "Did not update `{item}` since new quantity would be negative.\n\
             Location = `{location}`\n\
             {change_label} = `{change}`\n\
             Current = `{current}`\n\
             New = `{would_be}`"
        ),
    }
}

fn edit_embed(item: &str, location: &str, plan: &EditPlan, actor: &User) -> Embed {
    EmbedBuilder::new("EDIT STOCK")
        .description("The following stock was edited successfully.")
        .color(COLOR_LIME_GREEN)
        .field("Item", item)
        .field("Quantity Edited", plan.delta)
        .field("Old Quantity", plan.old_quantity)
        .field("New Quantity", plan.new_quantity)
        .field("Location", location)
        .author(&actor.username)
        .build()
}

fn move_embed(
    item: &str,
    source: &str,
    destination: &str,
    plan: &MovePlan,
    actor: &User,
) -> Embed {
    EmbedBuilder::new("MOVE STOCK")
        .description("The following stock was moved successfully.")
        .color(COLOR_LIME_GREEN)
        .field("Item", item)
        .field("Quantity Moved", plan.quantity)
        .field("Previous Location", source)
        .field("New Location", destination)
        .field(format!("{source} Old Quantity"), plan.source_old)
        .field(format!("{source} New Quantity"), plan.source_new)
        .field(format!("{destination} Old Quantity"), plan.destination_old)
        .field(format!("{destination} New Quantity"), plan.destination_new)
        .author(&actor.username)
        .build()
}

pub fn error_embed(reason: &str, actor: &User) -> Embed {
    EmbedBuilder::new("ERROR")
        .description("The stock command failed with an error.")
        .color(COLOR_RED)
        .field("Reason", reason)
        .author(&actor.username)
        .build()
}

/// Registration schema; item and location choices come from the catalog.
pub fn metadata(catalog: &Catalog) -> CommandMetadata {
    let items = || {
        catalog.items().iter().map(|item| (item.name.as_str(), item.id.0.as_str()))
    };
    let storages = || {
        catalog.storages().iter().map(|storage| (storage.name.as_str(), storage.id.0.as_str()))
    };
    let quantity_description = "Quantity of item being added/removed from inventory";

    CommandMetadata::chat_input(
        COMMAND_NAME,
        "Stock Inventory",
        vec![
            CommandOption::subcommand(
                StockSubcommand::Edit.as_str(),
                "Edit (add/remove) items from stock inventories",
                vec![
                    CommandOption::string(
                        OPTION_ITEM,
                        "Item being added/removed from inventory",
                    )
                    .required()
                    .string_choices(items()),
                    CommandOption::string(
                        OPTION_LOCATION,
                        "Inventory location item added/removed to/from",
                    )
                    .required()
                    .string_choices(storages()),
                    CommandOption::integer(OPTION_QUANTITY, quantity_description).required(),
                ],
            ),
            CommandOption::subcommand(
                StockSubcommand::Move.as_str(),
                "Move items from one stock inventory to another",
                vec![
                    CommandOption::string(OPTION_ITEM, "Item being moved from inventory")
                        .required()
                        .string_choices(items()),
                    CommandOption::string(
                        OPTION_OLD_LOCATION,
                        "Old inventory location that items are being moved from",
                    )
                    .required()
                    .string_choices(storages()),
                    CommandOption::string(
                        OPTION_NEW_LOCATION,
                        "New inventory location that items are being moved to",
                    )
                    .required()
                    .string_choices(storages()),
                    CommandOption::integer(OPTION_QUANTITY, quantity_description).required(),
                ],
            ),
        ],
    )
}
