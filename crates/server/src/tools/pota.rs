//! pota_callstats and pota_activations tool implementations.
//!
//! Queries the Parks on the Air API through the web cache. The API reports
//! failures as a bare JSON string (e.g. `"Park not found"`) with a success
//! status, so every response is checked for that shape first.

use std::fmt::Write as _;

use hamclub_client::with_path_segments;
use hamclub_core::{Card, CacheEntry, Error, WebCache};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::json_result;
use crate::error::ToolError;

const POTA_API: &str = "https://api.pota.app";

/// Parameters for the pota_callstats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallStatsParams {
    /// The callsign to look up.
    pub callsign: String,
}

/// Parameters for the pota_activations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivationsParams {
    /// The park reference (e.g. US-8081).
    pub park: String,
}

#[derive(Debug, Deserialize)]
struct UserStats {
    activator: ActivatorStats,
    attempts: AttemptStats,
    hunter: HunterStats,
}

#[derive(Debug, Deserialize)]
struct ActivatorStats {
    activations: u64,
    parks: u64,
    qsos: u64,
}

#[derive(Debug, Deserialize)]
struct AttemptStats {
    activations: u64,
    parks: u64,
}

#[derive(Debug, Deserialize)]
struct HunterStats {
    parks: u64,
    qsos: u64,
}

#[derive(Debug, Deserialize)]
struct ParkStats {
    activations: u64,
    attempts: u64,
    contacts: u64,
}

#[derive(Debug, Deserialize)]
struct ParkInfo {
    reference: String,
    name: String,
    #[serde(rename = "locationName")]
    location_name: String,
    #[serde(default)]
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Activation {
    qso_date: serde_json::Value,
    #[serde(rename = "activeCallsign")]
    active_callsign: String,
    #[serde(rename = "totalQSOs")]
    total_qsos: u64,
    #[serde(rename = "qsosCW")]
    qsos_cw: u64,
    #[serde(rename = "qsosDATA")]
    qsos_data: u64,
    #[serde(rename = "qsosPHONE")]
    qsos_phone: u64,
}

/// Implementation of the pota_callstats tool.
pub async fn callstats_impl(cache: &WebCache, params: CallStatsParams) -> Result<CallToolResult, McpError> {
    let callsign = params.callsign.trim().to_uppercase();
    if callsign.is_empty() {
        return Err(Error::InvalidInput("callsign cannot be empty".into()).into());
    }

    let url = api_url(&["stats", "user", &callsign])?;
    let entry = cache.get(&url).await?;
    tracing::debug!(%url, bytes = entry.content().len(), "queried pota user stats");

    let subject = format!("callsign {callsign}");
    let stats: UserStats = parse_response(&entry, &subject)?;

    let profile = format!("https://pota.app/#/profile/{}", encode_fragment(&callsign));
    let card = Card::new(
        format!("{callsign}'s POTA Stats"),
        format!(
            "Information provided by [pota.app](https://pota.app).\n\nSee [{callsign}'s profile]({profile}) for details."
        ),
    )
    .field("Activator", format_activator(&stats), false)
    .field("Hunter", format_hunter(&stats.hunter), false)
    .footer(entry.last_refreshed());

    json_result(&card)
}

/// Implementation of the pota_activations tool.
pub async fn activations_impl(cache: &WebCache, params: ActivationsParams) -> Result<CallToolResult, McpError> {
    let park = params.park.trim().to_uppercase();
    if park.is_empty() {
        return Err(Error::InvalidInput("park cannot be empty".into()).into());
    }

    let stats_url = api_url(&["park", "stats", &park])?;
    let info_url = api_url(&["park", &park])?;
    let recent_url = format!("{}?count=5", api_url(&["park", "activations", &park])?);

    let (stats_entry, info_entry, recent_entry) =
        tokio::try_join!(cache.get(&stats_url), cache.get(&info_url), cache.get(&recent_url))?;

    let subject = format!("park {park}");
    let stats: ParkStats = parse_response(&stats_entry, &subject)?;
    let info: ParkInfo = parse_response(&info_entry, &subject)?;
    let recent: Vec<Activation> = parse_response(&recent_entry, &subject)?;

    let card = Card::new(format!("{park} Stats"), "Information provided by [pota.app](https://pota.app).")
        .field("Park Name", format_park_name(&info), false)
        .field("Stats", format_park_stats(&stats), false)
        .field("Recent Activations", format_recent_activations(&recent), false)
        .footer(recent_entry.last_refreshed());

    json_result(&card)
}

fn api_url(segments: &[&str]) -> Result<String, Error> {
    with_path_segments(POTA_API, segments.iter().copied())
        .map(|url| url.to_string())
        .map_err(|e| Error::InvalidUrl(e.to_string()))
}

/// Decode a POTA response, turning the API's bare-string errors into `ToolError::Pota`.
fn parse_response<T: DeserializeOwned>(entry: &CacheEntry, subject: &str) -> Result<T, ToolError> {
    let value: serde_json::Value = serde_json::from_slice(entry.content())
        .map_err(|e| ToolError::PotaShape { subject: subject.to_string(), reason: e.to_string() })?;

    if let serde_json::Value::String(message) = value {
        return Err(ToolError::Pota { subject: subject.to_string(), message });
    }

    serde_json::from_value(value).map_err(|e| ToolError::PotaShape { subject: subject.to_string(), reason: e.to_string() })
}

fn encode_fragment(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            other => format!("%{other:02X}"),
        })
        .collect()
}

fn format_activator(stats: &UserStats) -> String {
    format!(
        "{}/{} activations in {}/{} parks. {} total QSOs.",
        stats.activator.activations,
        stats.attempts.activations,
        stats.activator.parks,
        stats.attempts.parks,
        stats.activator.qsos
    )
}

fn format_hunter(hunter: &HunterStats) -> String {
    format!("{} hunted parks. {} total QSOs.", hunter.parks, hunter.qsos)
}

fn format_park_name(info: &ParkInfo) -> String {
    let link = format!("https://pota.app/#/park/{}", encode_fragment(&info.reference));
    let location = format!("{}, {}", info.name, info.location_name);
    match info.website.as_deref().filter(|w| !w.is_empty()) {
        Some(website) => format!("[{}]({link}) - [{location}]({website})", info.reference),
        None => format!("[{}]({link}) - {location}", info.reference),
    }
}

fn format_park_stats(stats: &ParkStats) -> String {
    format!("{}/{} activations, {} QSOs", stats.activations, stats.attempts, stats.contacts)
}

fn format_recent_activations(activations: &[Activation]) -> String {
    let mut out = String::new();
    for a in activations {
        let _ = writeln!(out, "* {} - **{}** - {} QSOs", format_qso_date(&a.qso_date), a.active_callsign, a.total_qsos);
        let _ = writeln!(out, "  * {} CW, {} Data, {} Phone", a.qsos_cw, a.qsos_data, a.qsos_phone);
    }
    if out.is_empty() {
        out.push_str("No recent activations.");
    }
    out
}

/// `20240501` (string or number) becomes `2024-05-01`; anything else is shown as is.
fn format_qso_date(date: &serde_json::Value) -> String {
    let raw = match date {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubFetcher, cache, output_json};

    const USER_STATS: &str = r#"{
        "callsign": "W1AW",
        "activator": {"activations": 12, "parks": 8, "qsos": 640},
        "attempts": {"activations": 14, "parks": 9, "qsos": 655},
        "hunter": {"parks": 120, "qsos": 300}
    }"#;

    const PARK_STATS: &str = r#"{"reference": "US-8081", "attempts": 30, "activations": 25, "contacts": 1500}"#;

    const PARK_INFO: &str = r#"{
        "reference": "US-8081", "name": "Example State Forest",
        "locationName": "Massachusetts", "website": "https://example.org/forest"
    }"#;

    const RECENT: &str = r#"[
        {"qso_date": "20240501", "activeCallsign": "K1ABC", "totalQSOs": 42,
         "qsosCW": 10, "qsosDATA": 12, "qsosPHONE": 20}
    ]"#;

    #[test]
    fn test_format_qso_date() {
        assert_eq!(format_qso_date(&serde_json::json!("20240501")), "2024-05-01");
        assert_eq!(format_qso_date(&serde_json::json!(20240501)), "2024-05-01");
        assert_eq!(format_qso_date(&serde_json::json!("2024-05-01")), "2024-05-01");
    }

    #[test]
    fn test_encode_fragment() {
        assert_eq!(encode_fragment("US-8081"), "US-8081");
        assert_eq!(encode_fragment("W1AW/P"), "W1AW%2FP");
    }

    #[test]
    fn test_format_recent_activations_empty() {
        assert_eq!(format_recent_activations(&[]), "No recent activations.");
    }

    #[tokio::test]
    async fn test_callstats_impl() {
        let cache = cache(StubFetcher::default().with("https://api.pota.app/stats/user/W1AW", USER_STATS));

        let result = callstats_impl(&cache, CallStatsParams { callsign: " w1aw ".into() }).await.unwrap();
        let card = output_json(&result);
        assert_eq!(card["title"], "W1AW's POTA Stats");
        assert_eq!(card["fields"][0]["value"], "12/14 activations in 8/9 parks. 640 total QSOs.");
        assert_eq!(card["fields"][1]["value"], "120 hunted parks. 300 total QSOs.");
        assert_eq!(card["footer"], "Just refreshed");
    }

    #[tokio::test]
    async fn test_callstats_api_error_message() {
        let cache = cache(StubFetcher::default().with("https://api.pota.app/stats/user/NOPE", r#""User not found""#));

        let err = callstats_impl(&cache, CallStatsParams { callsign: "nope".into() }).await.unwrap_err();
        assert!(err.message.contains("callsign NOPE: User not found"));
    }

    #[tokio::test]
    async fn test_activations_impl() {
        let cache = cache(
            StubFetcher::default()
                .with("https://api.pota.app/park/stats/US-8081", PARK_STATS)
                .with("https://api.pota.app/park/US-8081", PARK_INFO)
                .with("https://api.pota.app/park/activations/US-8081?count=5", RECENT),
        );

        let result = activations_impl(&cache, ActivationsParams { park: "us-8081".into() }).await.unwrap();
        let card = output_json(&result);
        assert_eq!(card["title"], "US-8081 Stats");
        assert_eq!(
            card["fields"][0]["value"],
            "[US-8081](https://pota.app/#/park/US-8081) - [Example State Forest, Massachusetts](https://example.org/forest)"
        );
        assert_eq!(card["fields"][1]["value"], "25/30 activations, 1500 QSOs");
        assert_eq!(
            card["fields"][2]["value"],
            "* 2024-05-01 - **K1ABC** - 42 QSOs\n  * 10 CW, 12 Data, 20 Phone\n"
        );
    }

    #[tokio::test]
    async fn test_activations_unknown_park() {
        let cache = cache(
            StubFetcher::default()
                .with("https://api.pota.app/park/stats/US-0000", r#""Park not found""#)
                .with("https://api.pota.app/park/US-0000", "null")
                .with("https://api.pota.app/park/activations/US-0000?count=5", "[]"),
        );

        let err = activations_impl(&cache, ActivationsParams { park: "US-0000".into() }).await.unwrap_err();
        assert!(err.message.contains("park US-0000: Park not found"));
    }

    #[tokio::test]
    async fn test_activations_fetch_failure() {
        let cache = cache(StubFetcher::default());
        let err = activations_impl(&cache, ActivationsParams { park: "US-8081".into() }).await.unwrap_err();
        assert!(err.message.contains("FETCH_ERROR"));
    }
}
