//! Parsing and validation of the model's transaction payload
//!
//! The response is an untrusted document: every element is validated on its
//! own into a [`CandidateTransaction`] or dropped.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::{CandidateTransaction, TransactionKind, FALLBACK_CATEGORY, UNKNOWN_MERCHANT};

/// One raw element of `transactions`, before validation
///
/// Field names also accept the legacy French keys.
#[derive(Debug, Default, Deserialize)]
struct RawTransaction {
    #[serde(default, alias = "enseigne")]
    merchant: Option<Value>,
    #[serde(default)]
    date: Option<Value>,
    #[serde(default, alias = "montant")]
    amount: Option<Value>,
    #[serde(default, alias = "type")]
    kind: Option<Value>,
    #[serde(default, alias = "categorie")]
    category: Option<Value>,
}

fn opening_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*\s*").expect("valid regex"))
}

fn closing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```$").expect("valid regex"))
}

/// Remove a surrounding Markdown code fence (with or without a language tag)
///
/// Idempotent: stripping an already-stripped text changes nothing.
pub fn strip_code_fence(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let without_open = opening_fence().replace(&current, "");
        let stripped = closing_fence().replace(&without_open, "").trim().to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Parse the model response into validated candidates
///
/// `categories` is the user's ordered category names; `reference_date`
/// stands in for missing or unreadable dates.
pub fn parse_transactions(
    response: &str,
    reference_date: NaiveDate,
    categories: &[String],
) -> Result<Vec<CandidateTransaction>, ExtractionError> {
    let cleaned = strip_code_fence(response);

    let document: Value = serde_json::from_str(&cleaned).map_err(|e| {
        debug!("Model response is not JSON: {}", e);
        ExtractionError::InvalidAIResponse
    })?;

    let elements = document
        .as_object()
        .and_then(|obj| obj.get("transactions"))
        .and_then(Value::as_array)
        .ok_or(ExtractionError::UnexpectedFormat)?;

    let total = elements.len();
    let candidates: Vec<CandidateTransaction> = elements
        .iter()
        .enumerate()
        .filter_map(|(i, element)| validate_element(i, element, reference_date, categories))
        .collect();

    debug!(
        received = total,
        kept = candidates.len(),
        "Validated model transactions"
    );

    if candidates.is_empty() {
        return Err(ExtractionError::NoTransactionsDetected);
    }
    Ok(candidates)
}

fn validate_element(
    position: usize,
    element: &Value,
    reference_date: NaiveDate,
    categories: &[String],
) -> Option<CandidateTransaction> {
    if !element.is_object() {
        debug!(position, "Dropping non-object transaction element");
        return None;
    }

    let raw: RawTransaction = match serde_json::from_value(element.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(position, "Dropping malformed transaction element: {}", e);
            return None;
        }
    };

    let Some(amount) = raw.amount.as_ref().and_then(coerce_amount) else {
        debug!(position, amount = ?raw.amount, "Dropping transaction without a positive amount");
        return None;
    };

    let category_guess = raw.category.as_ref().and_then(Value::as_str);
    let kind = TransactionKind::from_wire(raw.kind.as_ref().and_then(Value::as_str));

    Some(CandidateTransaction {
        merchant: coerce_merchant(raw.merchant.as_ref()),
        date: coerce_date(raw.date.as_ref(), reference_date),
        amount,
        kind,
        category: resolve_category(category_guess, categories),
    })
}

/// Positive, finite decimal from a JSON number or numeric string
///
/// Strings may carry surrounding whitespace, a decimal comma, thousands
/// separators and a trailing currency sign ("23,40 €").
pub fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_amount_str(s)?,
        _ => return None,
    };
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

fn parse_amount_str(s: &str) -> Option<f64> {
    let trimmed = s
        .trim()
        .trim_end_matches(|c: char| matches!(c, '€' | '$' | '£') || c.is_whitespace())
        .trim_end_matches("EUR")
        .trim();
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    // With both marks present, the later one is the decimal separator
    let normalized = match (compact.rfind(','), compact.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        _ => compact.replace(',', "."),
    };
    normalized.parse::<f64>().ok()
}

fn coerce_merchant(value: Option<&Value>) -> String {
    let name = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if name.is_empty() {
        UNKNOWN_MERCHANT.to_string()
    } else {
        name
    }
}

fn coerce_date(value: Option<&Value>, reference_date: NaiveDate) -> NaiveDate {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => NaiveDate::parse_and_remainder(s, "%Y-%m-%d")
            .map(|(date, _time)| date)
            .unwrap_or_else(|_| {
                debug!(date = s, "Unreadable transaction date, using reference date");
                reference_date
            }),
        _ => reference_date,
    }
}

/// Reconcile the model's category guess with the user's categories
///
/// Exact match wins; otherwise [`closest_category`]. A missing guess takes
/// the first category; with no categories at all the result is
/// [`FALLBACK_CATEGORY`].
pub fn resolve_category(candidate: Option<&str>, categories: &[String]) -> String {
    let Some(first) = categories.first() else {
        return FALLBACK_CATEGORY.to_string();
    };
    match candidate.map(str::trim) {
        None => first.clone(),
        Some(guess) if categories.iter().any(|c| c == guess) => guess.to_string(),
        Some(guess) => closest_category(guess, categories),
    }
}

/// First category (store order) whose lower-cased name contains the guess
/// or is contained in it
///
/// First match wins, not best match. No match gives the first category.
pub fn closest_category(candidate: &str, categories: &[String]) -> String {
    let guess = candidate.to_lowercase();
    categories
        .iter()
        .find(|c| {
            let name = c.to_lowercase();
            guess.contains(&name) || name.contains(&guess)
        })
        .or_else(|| categories.first())
        .cloned()
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}
