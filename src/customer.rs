//! Customer records fed into the pipeline.
//!
//! A record carries the loyalty profile, a purchase history keyed by period
//! label (`month_1`, `month_2`, ...) and free-text feedback. Records are
//! plain immutable values; the pipeline never mutates them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, PipelineError};

/// A single purchased item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub item: String,
    pub category: String,
}

impl PurchaseRecord {
    pub fn new(item: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            category: category.into(),
        }
    }
}

/// Purchases grouped by period label.
///
/// Period labels are caller-supplied; only `month_1` (baseline) and
/// `month_3` (recent) are inspected by signal extraction.
pub type PurchaseHistory = BTreeMap<String, Vec<PurchaseRecord>>;

/// A piece of free-text customer feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub text: String,
}

impl FeedbackItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Loyalty-program standing of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub loyalty_tier: String,
    pub points_balance: i64,
    pub clubs: Vec<String>,
}

/// Input to one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub profile: CustomerProfile,
    #[serde(deserialize_with = "lenient_history")]
    pub purchase_history: PurchaseHistory,
    pub feedback: Vec<FeedbackItem>,
}

/// Decode each period on its own. A period that is not a list of purchases
/// becomes an empty basket instead of rejecting the record.
fn lenient_history<'de, D>(deserializer: D) -> Result<PurchaseHistory, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(period, items)| {
            let basket = serde_json::from_value::<Vec<PurchaseRecord>>(items).unwrap_or_else(|e| {
                tracing::warn!("Treating malformed period '{}' as empty: {}", period, e);
                Vec::new()
            });
            (period, basket)
        })
        .collect())
}

/// Top-level fields every record must carry.
const REQUIRED_FIELDS: [&str; 4] = ["customer_id", "profile", "purchase_history", "feedback"];

impl CustomerRecord {
    /// Build a record from an already-parsed JSON value.
    ///
    /// A missing top-level field is reported by name as `InvalidInput`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, PipelineError> {
        let obj = value.as_object().ok_or_else(|| {
            PipelineError::InvalidInput("customer record must be a JSON object".to_string())
        })?;

        if let Some(missing) = REQUIRED_FIELDS.iter().find(|k| !obj.contains_key(**k)) {
            return Err(PipelineError::InvalidInput(format!(
                "customer record is missing required field '{}'",
                missing
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| PipelineError::InvalidInput(format!("invalid customer record: {}", e)))
    }

    /// Parse a record from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, PipelineError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| PipelineError::InvalidInput(format!("customer JSON is invalid: {}", e)))?;
        Self::from_value(value)
    }

    /// Load a record from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded customer file {} ({} bytes)", path.display(), text.len());
        Ok(Self::from_json_str(&text)?)
    }

    /// Human-readable context lines: id, tier, points and clubs.
    pub fn context_lines(&self) -> Vec<String> {
        let clubs = if self.profile.clubs.is_empty() {
            "None".to_string()
        } else {
            self.profile.clubs.join(", ")
        };
        vec![
            format!("Customer ID: {}", self.customer_id),
            format!("Tier: {}", self.profile.loyalty_tier),
            format!("Points: {}", self.profile.points_balance),
            format!("Clubs: {}", clubs),
        ]
    }
}

/// List the `*.json` files of a demo-customer directory, sorted by name.
pub fn list_customer_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}
