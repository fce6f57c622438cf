//! Search result records.

use serde::{Deserialize, Deserializer, Serialize};

/// One search hit, regardless of which provider produced it.
///
/// `url` is the identity key. Records with an empty url are invalid and are
/// dropped during ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Snippet or summary text.
    #[serde(default)]
    pub notes: String,
    /// Provider tag, e.g. "brave" or "exa".
    #[serde(default)]
    pub provider: String,
    /// Provider-reported score. Numeric strings are accepted on input;
    /// anything unparseable is treated as absent.
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
}

impl SourceRecord {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        notes: impl Into<String>,
        provider: impl Into<String>,
        score: Option<f64>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            notes: notes.into(),
            provider: provider.into(),
            score,
        }
    }

    /// The score as a number, `0.0` when absent.
    pub fn numeric_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// Parse a score from a JSON number or a numeric string.
pub fn parse_score(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_score))
}
