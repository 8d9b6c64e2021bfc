//! Data models for Budgie

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Category name used when a user has no categories at all
pub const FALLBACK_CATEGORY: &str = "Other";

/// Merchant name used when the model could not tell who was paid
pub const UNKNOWN_MERCHANT: &str = "Unknown";

// ========== Categories ==========

/// A user-defined spending category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    /// Unique per user; used verbatim in prompts and results
    pub name: String,
    pub icon: String,
    /// UI color (e.g., "#22c55e")
    pub color: String,
    /// Words that should steer the model towards this category, in user order
    pub keyword_hints: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub keyword_hints: Vec<String>,
}

impl NewCategory {
    pub fn new(name: &str, icon: &str, color: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            keyword_hints: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

// ========== Receipt extraction ==========

/// Direction of money for an extracted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    /// Lenient wire parsing: anything unrecognized is an expense
    ///
    /// Also accepts the French wire words ("depense", "revenu").
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("income") | Some("revenu") => Self::Income,
            _ => Self::Expense,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" | "depense" => Ok(Self::Expense),
            "income" | "revenu" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

/// A model-extracted transaction awaiting human review
///
/// Never persisted by the pipeline. `amount` is always > 0 and `category` is
/// always one of the user's category names (or [`FALLBACK_CATEGORY`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTransaction {
    pub merchant: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
}

/// One photographed receipt as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptImage {
    pub bytes: Vec<u8>,
    /// Content type reported by the uploader; informational only
    pub mime_type: Option<String>,
}

impl ReceiptImage {
    pub fn new(bytes: Vec<u8>, mime_type: Option<&str>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.map(str::to_string),
        }
    }
}
