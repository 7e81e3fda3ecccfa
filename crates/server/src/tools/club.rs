//! club, club_topics and manage_club_* tool implementations.
//!
//! Club info topics live in the guild store as JSON-encoded
//! [`ClubRecord`]s keyed by their lowercased topic name.

use base64::{Engine, prelude::BASE64_STANDARD};
use hamclub_core::{AppConfig, Card, ClubRecord, GuildDb, club::UploadLimits};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the club tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClubParams {
    pub guild_id: i64,
    /// Topic to show.
    pub what: String,
}

/// Parameters for the club_topics tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicsParams {
    pub guild_id: i64,
    /// What the user has typed so far.
    #[serde(default)]
    pub prefix: String,
}

/// Parameters for the manage_club_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateParams {
    pub guild_id: i64,
    /// The admin making the change.
    pub user_id: u64,
    pub what: String,
    /// Attachment filename; `.yml`/`.yaml` files are rendered as YAML cards.
    pub filename: String,
    /// Attachment content type, e.g. `text/markdown; charset=utf-8`.
    pub content_type: String,
    /// Attachment bytes, base64-encoded.
    pub content_base64: String,
}

/// Parameters for manage_club_get and manage_club_delete.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawParams {
    pub guild_id: i64,
    pub what: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClubOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicsOutput {
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateOutput {
    pub message: String,
    /// How the saved topic renders.
    pub preview: Card,
}

/// Raw topic content handed back to an admin.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawOutput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Implementation of the club tool.
pub async fn club_impl(db: &GuildDb, params: ClubParams) -> Result<CallToolResult, McpError> {
    let what = params.what.trim().to_lowercase();
    let output = match db.guild(params.guild_id).get_record(&what).await? {
        Some(record) => ClubOutput { card: Some(record.render()?), message: None },
        None => ClubOutput {
            card: None,
            message: Some(format!("I don't have any information about '{what}'. Ask the admin to add some!")),
        },
    };
    json_result(&output)
}

/// Implementation of the club_topics tool.
pub async fn topics_impl(db: &GuildDb, params: TopicsParams) -> Result<CallToolResult, McpError> {
    let prefix = params.prefix.trim().to_lowercase();
    let topics = db.guild(params.guild_id).list_keys(Some(&prefix)).await?;
    json_result(&TopicsOutput { topics })
}

/// Implementation of the manage_club_update tool.
///
/// The record is rendered before it is stored so that a YAML file that
/// does not describe a card is rejected instead of saved.
pub async fn update_impl(db: &GuildDb, config: &AppConfig, params: UpdateParams) -> Result<CallToolResult, McpError> {
    let bytes = BASE64_STANDARD
        .decode(params.content_base64.trim())
        .map_err(|e| ToolError::Attachment(e.to_string()))?;

    let limits = UploadLimits { max_bytes: config.max_upload_bytes };
    let record = ClubRecord::from_upload(
        &params.what,
        &params.filename,
        &params.content_type,
        &bytes,
        params.user_id,
        limits,
    )?;
    let preview = record.render()?;

    db.guild(params.guild_id).put_record(&record, config.max_records).await?;
    tracing::info!(guild_id = params.guild_id, what = %record.what, user_id = params.user_id, "saved club topic");

    json_result(&UpdateOutput { message: format!("OK, I saved this change to '{}' for you.", record.what), preview })
}

/// Implementation of the manage_club_get tool.
pub async fn get_impl(db: &GuildDb, params: RawParams) -> Result<CallToolResult, McpError> {
    let what = params.what.trim().to_lowercase();
    let output = match db.guild(params.guild_id).get_record(&what).await? {
        Some(record) => raw_output(format!("Here is the raw content associated with /club {what}"), record),
        None => RawOutput {
            message: format!("I don't have any information about '{what}'. Add some using /manage_club update"),
            filename: None,
            content: None,
        },
    };
    json_result(&output)
}

/// Implementation of the manage_club_delete tool.
pub async fn delete_impl(db: &GuildDb, params: RawParams) -> Result<CallToolResult, McpError> {
    let what = params.what.trim().to_lowercase();
    let store = db.guild(params.guild_id);

    let Some(record) = store.get_record(&what).await? else {
        return json_result(&RawOutput {
            message: format!("Nothing to delete. I don't have any information about '{what}' stored."),
            filename: None,
            content: None,
        });
    };

    store.delete(&what).await?;
    tracing::info!(guild_id = params.guild_id, what = %what, "deleted club topic");

    json_result(&raw_output(
        format!("I deleted the content associated with /club {what}. Here it is in case you want to back it up."),
        record,
    ))
}

fn raw_output(message: String, record: ClubRecord) -> RawOutput {
    RawOutput { message, filename: Some(record.raw_filename()), content: Some(record.content) }
}
