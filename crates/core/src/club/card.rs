//! Plain-data rendering of a reply.
//!
//! The gateway adapter turns a [`Card`] into whatever rich message format
//! it supports.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A titled block of text with optional named fields and footer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<CardField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Card {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: Some(title.into()), description: Some(description.into()), ..Default::default() }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(CardField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let card = Card::new("Title", "Body").field("Name", "Value", false).footer("Just refreshed");
        assert_eq!(card.title.as_deref(), Some("Title"));
        assert_eq!(card.fields.len(), 1);
        assert!(!card.fields[0].inline);
        assert_eq!(card.footer.as_deref(), Some("Just refreshed"));
    }

    #[test]
    fn test_empty_parts_not_serialized() {
        let json = serde_json::to_value(Card::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
