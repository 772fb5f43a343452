use serde::{Serialize, Serializer};

pub const COLOR_LIME_GREEN: u32 = 8_584_966;
pub const COLOR_RED: u32 = 15_548_997;

pub const DEFERRED_CONTENT: &str = "*⏳ Loading...*";
pub const NO_HANDLER_CONTENT: &str = "No command handler found.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    Pong,
    ChannelMessageWithSource,
    DeferredChannelMessageWithSource,
}

impl ResponseKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::ChannelMessageWithSource => 4,
            Self::DeferredChannelMessageWithSource => 5,
        }
    }
}

impl Serialize for ResponseKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|field| field.name == name).map(|field| field.value.as_str())
    }
}

pub struct EmbedBuilder {
    embed: Embed,
}

impl EmbedBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self { embed: Embed { title: Some(title.into()), ..Embed::default() } }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.embed.color = Some(color);
        self
    }

    pub fn author(mut self, name: impl Into<String>) -> Self {
        self.embed.author = Some(EmbedAuthor { name: name.into() });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.embed.fields.push(EmbedField {
            name: name.into(),
            value: value.to_string(),
            inline: false,
        });
        self
    }

    pub fn build(self) -> Embed {
        self.embed
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub tts: bool,
    pub content: String,
    pub embeds: Vec<Embed>,
}

/// Synchronous answer to the webhook call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: ResponseKind::Pong, data: None }
    }

    pub fn message(content: impl Into<String>, embeds: Vec<Embed>) -> Self {
        Self {
            kind: ResponseKind::ChannelMessageWithSource,
            data: Some(MessageData { tts: false, content: content.into(), embeds }),
        }
    }

    pub fn deferred() -> Self {
        Self {
            kind: ResponseKind::DeferredChannelMessageWithSource,
            data: Some(MessageData {
                content: DEFERRED_CONTENT.to_owned(),
                ..MessageData::default()
            }),
        }
    }

    pub fn no_handler() -> Self {
        Self::message(NO_HANDLER_CONTENT, Vec::new())
    }
}

/// Body of the out-of-band edit to the original (deferred) reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FollowupMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub components: Vec<serde_json::Value>,
}

impl FollowupMessage {
    pub fn new(content: impl Into<String>, embeds: Vec<Embed>) -> Self {
        Self { content: content.into(), embeds, components: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EmbedBuilder, FollowupMessage, InteractionResponse, COLOR_RED};

    #[test]
    fn responses_serialize_with_numeric_type_codes() {
        let pong = serde_json::to_value(InteractionResponse::pong()).expect("json");
        assert_eq!(pong, json!({"type": 1}));
        assert_eq!(
            serde_json::to_value(InteractionResponse::deferred()).expect("json"),
            json!({"type": 5, "data": {"tts": false, "content": "*⏳ Loading...*", "embeds": []}})
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::no_handler()).expect("json"),
            json!({
                "type": 4,
                "data": {"tts": false, "content": "No command handler found.", "embeds": []}
            })
        );
    }

    #[test]
    fn embed_builder_keeps_field_order() {
        let embed = EmbedBuilder::new("ERROR")
            .description("The stock command failed with an error.")
            .color(COLOR_RED)
            .author("stocker")
            .field("Reason", "nope")
            .field("Count", 3)
            .build();

        assert_eq!(embed.field("Count"), Some("3"));
        assert_eq!(
            serde_json::to_value(&embed).expect("json"),
            json!({
                "title": "ERROR",
                "description": "The stock command failed with an error.",
                "color": 15548997,
                "author": {"name": "stocker"},
                "fields": [{"name": "Reason", "value": "nope"}, {"name": "Count", "value": "3"}]
            })
        );
    }

    #[test]
    fn followup_always_clears_components() {
        let body = serde_json::to_value(FollowupMessage::new("done", Vec::new())).expect("json");
        assert_eq!(body, json!({"content": "done", "embeds": [], "components": []}));
    }
}
