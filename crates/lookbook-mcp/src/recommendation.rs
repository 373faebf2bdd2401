//! Recommendation items as returned by the remote tool.
//!
//! The tool's output is loosely typed (numbers sometimes arrive as strings,
//! older servers call the score `similarity`), so items are decoded through
//! a permissive raw form. A missing or unusable field becomes `None` and the
//! display accessors substitute placeholders.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Shown when an item has no usable title.
pub const PLACEHOLDER_TITLE: &str = "Untitled";

/// Shown when an item has no image/link.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/600";

/// One ranked recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawItem")]
pub struct RecommendationItem {
    /// Stable catalog key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Relevance score, higher is better.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Free-text rationale for the match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Product image / link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RecommendationItem {
    /// Title, or the placeholder when missing or blank.
    pub fn display_title(&self) -> &str {
        non_blank(self.title.as_deref()).unwrap_or(PLACEHOLDER_TITLE)
    }

    /// Price as `$12.34`, or `$??` when unknown.
    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) => format!("${:.2}", price),
            None => "$??".to_string(),
        }
    }

    /// Score to three decimals, or `n/a` when unknown.
    pub fn display_score(&self) -> String {
        match self.score {
            Some(score) => format!("{:.3}", score),
            None => "n/a".to_string(),
        }
    }

    /// Image/link URL, or the placeholder image.
    pub fn image_url(&self) -> &str {
        non_blank(self.url.as_deref()).unwrap_or(PLACEHOLDER_IMAGE_URL)
    }

    /// Rationale, if the server gave a non-blank one.
    pub fn display_reason(&self) -> Option<&str> {
        non_blank(self.reason.as_deref())
    }

    /// Key for rendering: the SKU when present, else the list position.
    pub fn key(&self, index: usize) -> String {
        match non_blank(self.sku.as_deref()) {
            Some(sku) => sku.to_string(),
            None => index.to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Decode a JSON array of items. Entries that are not objects are skipped.
pub fn items_from_values(values: &[Value]) -> Vec<RecommendationItem> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| {
            if !value.is_object() {
                tracing::warn!(index, value = %value, "skipping non-object recommendation");
                return None;
            }
            match serde_json::from_value::<RecommendationItem>(value.clone()) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping unreadable recommendation");
                    None
                }
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Permissive decoding
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawItem {
    #[serde(default, deserialize_with = "lenient_string")]
    sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    similarity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    url: Option<String>,
}

impl From<RawItem> for RecommendationItem {
    fn from(raw: RawItem) -> Self {
        Self {
            sku: raw.sku,
            title: raw.title,
            price: raw.price,
            score: raw.score.or(raw.similarity),
            reason: raw.reason,
            url: raw.url,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}
