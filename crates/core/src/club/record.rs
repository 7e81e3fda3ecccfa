//! Club info record model and its storage helpers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use super::card::{Card, CardField};
use crate::{Error, PersistentGuildStore};

/// How the record content is interpreted when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Markdown,
    Yaml,
}

impl RecordKind {
    /// `.yaml`/`.yml` files are YAML cards; anything else is markdown.
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
            Some(ext) if ext == "yaml" || ext == "yml" => RecordKind::Yaml,
            _ => RecordKind::Markdown,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            RecordKind::Markdown => "md",
            RecordKind::Yaml => "yml",
        }
    }
}

/// Who last changed a record and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUpdated {
    pub user_id: u64,
    pub timestamp: DateTime<Utc>,
}

/// A stored club info topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubRecord {
    /// Decoded text of the uploaded file.
    pub content: String,
    /// Character set the upload was encoded with.
    pub charset: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Lowercased topic name; also the store key.
    pub what: String,
    pub last_updated: LastUpdated,
}

/// Limits applied to uploaded club info files.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self { max_bytes: 5120 }
    }
}

#[derive(Deserialize)]
struct YamlCard {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    fields: Vec<YamlField>,
}

#[derive(Deserialize)]
struct YamlField {
    #[serde(default)]
    name: serde_yaml::Value,
    #[serde(default)]
    value: serde_yaml::Value,
    #[serde(default = "default_inline")]
    inline: bool,
}

fn default_inline() -> bool {
    true
}

impl ClubRecord {
    /// Build a record from an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the file is not `text/*`, is larger
    /// than the upload limit, or is not valid in its declared charset.
    pub fn from_upload(
        what: &str, filename: &str, content_type: &str, bytes: &[u8], user_id: u64, limits: UploadLimits,
    ) -> Result<Self, Error> {
        let what = what.trim().to_lowercase();
        if what.is_empty() {
            return Err(Error::InvalidInput("topic name cannot be empty".into()));
        }

        let (major, _minor, mime_params) = parse_content_type(content_type);
        if major != "text" {
            return Err(Error::InvalidInput(format!(
                "looks like you sent an invalid file of type {major}; please send a text file"
            )));
        }

        if bytes.len() > limits.max_bytes {
            return Err(Error::InvalidInput(format!(
                "files must be at most {} bytes; you sent a file of {} bytes",
                limits.max_bytes,
                bytes.len()
            )));
        }

        let charset = mime_params
            .get("charset")
            .cloned()
            .unwrap_or_else(|| "utf-8".to_string());
        let content = decode(bytes, &charset)?;

        Ok(Self {
            content,
            charset,
            kind: RecordKind::from_filename(filename),
            what,
            last_updated: LastUpdated { user_id, timestamp: Utc::now() },
        })
    }

    /// Filename to use when handing the raw content back to an admin.
    pub fn raw_filename(&self) -> String {
        format!("{}.{}", self.what, self.kind.extension())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the record as a card.
    ///
    /// Markdown becomes the description. YAML supplies title, description
    /// and fields; fields are inline unless they say otherwise.
    pub fn render(&self) -> Result<Card, Error> {
        match self.kind {
            RecordKind::Markdown => Ok(Card { description: Some(self.content.clone()), ..Default::default() }),
            RecordKind::Yaml => {
                let yaml: YamlCard = serde_yaml::from_str(&self.content)?;
                let fields = yaml
                    .fields
                    .into_iter()
                    .map(|f| CardField { name: yaml_text(f.name), value: yaml_text(f.value), inline: f.inline })
                    .collect();
                Ok(Card { title: yaml.title, description: yaml.description, fields, footer: None })
            }
        }
    }
}

impl PersistentGuildStore {
    /// Get and decode the club record stored under `what`.
    pub async fn get_record(&self, what: &str) -> Result<Option<ClubRecord>, Error> {
        match self.get(what).await? {
            Some(json) => Ok(Some(ClubRecord::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Store `record` under its topic name.
    ///
    /// Replacing an existing topic is always allowed; adding a new one is
    /// refused once the guild holds `max_records` topics. The check and the
    /// write happen in one transaction.
    pub async fn put_record(&self, record: &ClubRecord, max_records: usize) -> Result<(), Error> {
        let guild_id = self.guild_id();
        let key = record.what.clone();
        let value = record.to_json()?;
        self.db()
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM storage WHERE guild_id = ?1 AND key = ?2)",
                    params![guild_id, key],
                    |row| row.get(0),
                )?;
                if !exists {
                    let count: i64 = tx.query_row(
                        "SELECT COUNT(*) FROM storage WHERE guild_id = ?1",
                        params![guild_id],
                        |row| row.get(0),
                    )?;
                    if count as usize >= max_records {
                        return Err(Error::RecordLimit(max_records));
                    }
                }
                tx.execute(
                    "INSERT INTO storage (guild_id, key, value) VALUES (?1, ?2, ?3)
                    ON CONFLICT(guild_id, key) DO UPDATE SET value = excluded.value",
                    params![guild_id, key, value],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

/// Split a content type into lowercased major type, subtype and parameters.
fn parse_content_type(content_type: &str) -> (String, String, HashMap<String, String>) {
    let mut parts = content_type.split(';');
    let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let (major, minor) = match essence.split_once('/') {
        Some((major, minor)) => (major.trim().to_string(), minor.trim().to_string()),
        None => (essence.clone(), String::new()),
    };

    let params = parts
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().trim_matches('"').to_ascii_lowercase()))
        .collect();

    (major, minor, params)
}

fn decode(bytes: &[u8], charset: &str) -> Result<String, Error> {
    match charset {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::InvalidInput(format!("file is not valid utf-8: {e}"))),
        "us-ascii" | "ascii" => {
            if bytes.is_ascii() {
                Ok(String::from_utf8_lossy(bytes).into_owned())
            } else {
                Err(Error::InvalidInput("file is not valid us-ascii".into()))
            }
        }
        other => Err(Error::InvalidInput(format!("unsupported charset: {other}"))),
    }
}

fn yaml_text(value: serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other).unwrap_or_default().trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuildDb;

    fn upload(what: &str, filename: &str, content: &str) -> ClubRecord {
        ClubRecord::from_upload(
            what,
            filename,
            "text/plain; charset=utf-8",
            content.as_bytes(),
            42,
            UploadLimits::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_kind_from_filename() {
        assert_eq!(RecordKind::from_filename("repeaters.yml"), RecordKind::Yaml);
        assert_eq!(RecordKind::from_filename("repeaters.YAML"), RecordKind::Yaml);
        assert_eq!(RecordKind::from_filename("meetings.md"), RecordKind::Markdown);
        assert_eq!(RecordKind::from_filename("notes"), RecordKind::Markdown);
    }

    #[test]
    fn test_from_upload() {
        let record = upload("Meetings", "meetings.md", "First Tuesday");
        assert_eq!(record.what, "meetings");
        assert_eq!(record.charset, "utf-8");
        assert_eq!(record.kind, RecordKind::Markdown);
        assert_eq!(record.last_updated.user_id, 42);
        assert_eq!(record.raw_filename(), "meetings.md");
    }

    #[test]
    fn test_from_upload_defaults_charset() {
        let record =
            ClubRecord::from_upload("nets", "nets.yml", "text/yaml", b"title: Nets", 1, UploadLimits::default())
                .unwrap();
        assert_eq!(record.charset, "utf-8");
        assert_eq!(record.raw_filename(), "nets.yml");
    }

    #[test]
    fn test_from_upload_rejects_non_text() {
        let result =
            ClubRecord::from_upload("logo", "logo.png", "image/png", &[0x89, 0x50], 1, UploadLimits::default());
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("image")));
    }

    #[test]
    fn test_from_upload_size_limit() {
        let limits = UploadLimits { max_bytes: 4 };
        assert!(ClubRecord::from_upload("x", "x.md", "text/plain", b"1234", 1, limits).is_ok());
        let result = ClubRecord::from_upload("x", "x.md", "text/plain", b"12345", 1, limits);
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("5 bytes")));
    }

    #[test]
    fn test_from_upload_bad_encoding() {
        let result = ClubRecord::from_upload("x", "x.md", "text/plain", &[0xff, 0xfe], 1, UploadLimits::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result =
            ClubRecord::from_upload("x", "x.md", "text/plain; charset=koi8-r", b"abc", 1, UploadLimits::default());
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("koi8-r")));
    }

    #[test]
    fn test_json_layout() {
        let record = upload("meetings", "meetings.md", "First Tuesday");
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "markdown");
        assert_eq!(json["what"], "meetings");
        assert_eq!(json["last_updated"]["user_id"], 42);

        assert_eq!(ClubRecord::from_json(&record.to_json().unwrap()).unwrap(), record);
        assert!(matches!(ClubRecord::from_json("not json"), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn test_render_markdown() {
        let card = upload("meetings", "meetings.md", "**First Tuesday**").render().unwrap();
        assert_eq!(card.description.as_deref(), Some("**First Tuesday**"));
        assert!(card.title.is_none());
        assert!(card.fields.is_empty());
    }

    #[test]
    fn test_render_yaml() {
        let yaml = "title: Repeaters\ndescription: Local machines\nfields:\n  - name: W1ABC\n    value: 146.52\n  - name: Notes\n    value: PL 100.0\n    inline: false\n";
        let card = upload("repeaters", "repeaters.yml", yaml).render().unwrap();

        assert_eq!(card.title.as_deref(), Some("Repeaters"));
        assert_eq!(card.description.as_deref(), Some("Local machines"));
        assert_eq!(
            card.fields,
            vec![
                CardField { name: "W1ABC".into(), value: "146.52".into(), inline: true },
                CardField { name: "Notes".into(), value: "PL 100.0".into(), inline: false },
            ]
        );
    }

    #[test]
    fn test_render_yaml_field_without_name_or_value() {
        let yaml = "fields:\n  - value: Every Monday\n  - name: Location\n";
        let card = upload("nets", "nets.yml", yaml).render().unwrap();
        assert_eq!(
            card.fields,
            vec![
                CardField { name: String::new(), value: "Every Monday".into(), inline: true },
                CardField { name: "Location".into(), value: String::new(), inline: true },
            ]
        );
    }

    #[test]
    fn test_render_bad_yaml() {
        let result = upload("bad", "bad.yml", "fields: [unclosed").render();
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_put_record_enforces_cap() {
        let store = GuildDb::open_in_memory().await.unwrap().guild(7);

        store.put_record(&upload("one", "one.md", "1"), 2).await.unwrap();
        store.put_record(&upload("two", "two.md", "2"), 2).await.unwrap();

        let result = store.put_record(&upload("three", "three.md", "3"), 2).await;
        assert!(matches!(result, Err(Error::RecordLimit(2))));

        // replacing an existing topic is still allowed at the cap
        store.put_record(&upload("two", "two.md", "2b"), 2).await.unwrap();
        let record = store.get_record("two").await.unwrap().unwrap();
        assert_eq!(record.content, "2b");
        assert_eq!(store.list_keys(None).await.unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_get_record_missing() {
        let store = GuildDb::open_in_memory().await.unwrap().guild(7);
        assert!(store.get_record("nothing").await.unwrap().is_none());
    }
}
