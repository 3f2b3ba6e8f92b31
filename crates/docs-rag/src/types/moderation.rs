//! Moderation verdict

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of classifying a piece of text for policy violations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    /// Whether any category was triggered
    pub flagged: bool,
    /// Per-category decision
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    /// Per-category score (0.0-1.0)
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
}

impl ModerationVerdict {
    /// A verdict that lets the text through
    pub fn clean() -> Self {
        Self::default()
    }

    /// Names of the triggered categories
    pub fn flagged_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, hit)| **hit)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Details safe to return to the caller when the text is rejected
    pub fn to_details(&self) -> serde_json::Value {
        serde_json::json!({
            "flagged": self.flagged,
            "categories": self.categories,
            "category_scores": self.category_scores,
        })
    }
}
