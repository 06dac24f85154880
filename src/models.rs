//! # Backend Payload Models
//!
//! Serde types for every JSON body exchanged with the VISUM backend.
//! The backend's field names are kept on the wire (`Analysis`, `savedAt`, ...)
//! and mapped onto snake_case Rust fields.
//!
//! Ingredient and product lists have arrived over time both as bare strings
//! and as `{name, description}` / `{name, benefits}` objects; all of these
//! decode into [`Item`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One device as reported by `/data/scan_bluetooth`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    pub rssi: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScanResponse {
    pub found: bool,
    #[serde(default)]
    pub device: Option<Sighting>,
}

/// Result of one scan cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    NotFound,
    Found(Sighting),
}

impl From<ScanResponse> for ScanOutcome {
    fn from(response: ScanResponse) -> Self {
        match (response.found, response.device) {
            (true, Some(device)) => ScanOutcome::Found(device),
            (true, None) => {
                log::warn!("Scan reported a device but sent no device payload");
                ScanOutcome::NotFound
            }
            (false, _) => ScanOutcome::NotFound,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<InteractionRecord>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SysCheckResponse {
    pub info: String,
}

/// Skin classification returned by `/data/image_check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinProfile {
    pub skin_color: String,
    pub texture: String,
}

/// Color/texture classification stored with an interaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub texture: Option<String>,
}

impl From<&SkinProfile> for Analysis {
    fn from(profile: &SkinProfile) -> Self {
        Self {
            color: Some(profile.skin_color.clone()),
            texture: Some(profile.texture.clone()),
        }
    }
}

/// A named ingredient or product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ItemRepr")]
pub struct Item {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Item {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemRepr {
    Name(String),
    Full {
        #[serde(alias = "title")]
        name: String,
        #[serde(default, alias = "benefits")]
        description: Option<String>,
    },
}

impl From<ItemRepr> for Item {
    fn from(repr: ItemRepr) -> Self {
        match repr {
            ItemRepr::Name(name) => Item::new(name, None),
            ItemRepr::Full { name, description } => Item::new(name, description),
        }
    }
}

/// One past visit recorded for a device. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "savedAt", default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(rename = "Analysis", default)]
    pub analysis: Option<Analysis>,
    #[serde(rename = "Ingredients", default)]
    pub ingredients: Option<Vec<Item>>,
    #[serde(rename = "Products", default)]
    pub products: Option<Vec<Item>>,
    #[serde(
        rename = "Recommendations",
        default,
        deserialize_with = "deserialize_free_text"
    )]
    pub recommendations: Option<String>,
    #[serde(default)]
    pub device: Option<Sighting>,
}

impl InteractionRecord {
    /// Timestamp rendered in local time when it parses, raw otherwise
    pub fn display_timestamp(&self) -> String {
        let Some(raw) = self.timestamp.as_deref().or(self.saved_at.as_deref()) else {
            return "Unknown time".to_string();
        };
        parse_timestamp(raw)
            .map(|ts| {
                ts.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| raw.to_string())
    }
}

/// Body of `/data/save_interaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionDraft {
    pub device: Sighting,
    #[serde(rename = "Analysis")]
    pub analysis: Option<Analysis>,
    #[serde(rename = "Ingredients")]
    pub ingredients: Vec<Item>,
    #[serde(rename = "Products")]
    pub products: Vec<Item>,
    #[serde(rename = "Recommendations")]
    pub recommendations: Option<String>,
    #[serde(rename = "savedAt")]
    pub saved_at: String,
}

/// Accepts RFC 3339 as well as the naive ISO format Python backends emit
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Recommendation text is usually a string, but older records stored a list
/// of `{type, description}` entries.
fn deserialize_free_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| value_to_text(&v)))
}

pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(entries) => {
            let lines: Vec<String> = entries.iter().filter_map(value_to_text).collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            }
        }
        Value::Object(map) => ["description", "text", "summary"]
            .iter()
            .find_map(|key| map.get(*key).and_then(value_to_text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_not_found() {
        let response: ScanResponse = serde_json::from_str(r#"{"found": false}"#).unwrap();
        assert_eq!(ScanOutcome::from(response), ScanOutcome::NotFound);
    }

    #[test]
    fn test_scan_found() {
        let json = r#"{"found": true, "device": {"address": "AA:BB", "name": null, "rssi": -61}}"#;
        let response: ScanResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            ScanOutcome::from(response),
            ScanOutcome::Found(Sighting {
                address: "AA:BB".to_string(),
                name: None,
                rssi: -61,
            })
        );
    }

    #[test]
    fn test_scan_found_without_device_is_ignored() {
        let response: ScanResponse = serde_json::from_str(r#"{"found": true}"#).unwrap();
        assert_eq!(ScanOutcome::from(response), ScanOutcome::NotFound);
    }

    #[test]
    fn test_interaction_record_accepts_mixed_item_shapes() {
        let json = r#"{
            "timestamp": "2025-03-01T10:15:00Z",
            "Analysis": {"color": "Medium", "texture": "Rough"},
            "Ingredients": ["Niacinamide", {"name": "Ceramides", "benefits": "Barrier repair"}],
            "Products": [{"name": "Gentle Cleanser", "description": "Low pH"}],
            "Recommendations": "Moisturize twice daily",
            "device": {"address": "AA:BB", "name": "Pixel", "rssi": -55}
        }"#;

        let record: InteractionRecord = serde_json::from_str(json).unwrap();
        let ingredients = record.ingredients.unwrap();
        assert_eq!(ingredients[0], Item::new("Niacinamide", None));
        assert_eq!(
            ingredients[1],
            Item::new("Ceramides", Some("Barrier repair".to_string()))
        );
        assert_eq!(record.products.unwrap()[0].name, "Gentle Cleanser");
        assert_eq!(record.analysis.unwrap().texture.as_deref(), Some("Rough"));
        assert_eq!(record.recommendations.as_deref(), Some("Moisturize twice daily"));
    }

    #[test]
    fn test_interaction_record_with_missing_sections() {
        let record: InteractionRecord =
            serde_json::from_str(r#"{"savedAt": "2025-03-01T10:15:00"}"#).unwrap();
        assert!(record.analysis.is_none());
        assert!(record.ingredients.is_none());
        assert!(record.recommendations.is_none());
        assert!(record.timestamp.is_none());
        assert_eq!(record.display_timestamp().len(), "2025-03-01 10:15:00".len());
    }

    #[test]
    fn test_recommendations_list_is_flattened() {
        let json = r#"{"Recommendations": [
            {"type": "routine", "description": "Use SPF"},
            "Drink water"
        ]}"#;
        let record: InteractionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.recommendations.as_deref(), Some("Use SPF\nDrink water"));
    }

    #[test]
    fn test_draft_uses_backend_field_names() {
        let draft = InteractionDraft {
            device: Sighting {
                address: "AA:BB".to_string(),
                name: Some("Pixel".to_string()),
                rssi: -50,
            },
            analysis: Some(Analysis {
                color: Some("Fair".to_string()),
                texture: Some("Smooth".to_string()),
            }),
            ingredients: vec![Item::new("Retinol", None)],
            products: vec![],
            recommendations: None,
            saved_at: "2025-03-01T10:15:00Z".to_string(),
        };

        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("Analysis").is_some());
        assert!(value.get("Ingredients").is_some());
        assert_eq!(value["savedAt"], "2025-03-01T10:15:00Z");
        assert_eq!(value["Ingredients"][0]["name"], "Retinol");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2025-03-01T10:15:00Z").is_some());
        assert!(parse_timestamp("2025-03-01T10:15:00.123456").is_some());
        assert!(parse_timestamp("2025-03-01 10:15:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_display_timestamp_falls_back_to_raw() {
        let record = InteractionRecord {
            timestamp: Some("yesterday".to_string()),
            saved_at: None,
            analysis: None,
            ingredients: None,
            products: None,
            recommendations: None,
            device: None,
        };
        assert_eq!(record.display_timestamp(), "yesterday");
    }
}
