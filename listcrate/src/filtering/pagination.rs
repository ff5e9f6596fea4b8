use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize::is_truthy;

/// Requested page. `page_limit == None` means the caller asked for every
/// remaining row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_nr: u64,
    pub page_limit: Option<u64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_nr: 1,
            page_limit: None,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub const fn new(page_nr: u64, page_limit: Option<u64>) -> Self {
        Self {
            page_nr,
            page_limit,
        }
    }

    /// Rows to skip: `(page_nr - 1) * page_limit` beyond the first page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        match self.page_limit {
            Some(limit) if self.page_nr > 1 => (self.page_nr - 1).saturating_mul(limit),
            _ => 0,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        self.page_limit
    }

    /// Whether any slicing applies at all.
    #[must_use]
    pub const fn is_paginated(&self) -> bool {
        self.page_limit.is_some() || self.page_nr > 1
    }
}

/// Numeric reading of a request value. Fractions are truncated and negative
/// numbers clamp to zero.
#[must_use]
pub fn parse_numeric(value: &Value) -> Option<u64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let truncated = number.max(0.0).trunc() as u64;
    Some(truncated)
}

/// Falsy page limits (`""`, `"0"`, `0`) count as absent.
#[must_use]
pub fn is_limit_given(value: Option<&Value>) -> bool {
    value.is_some_and(is_truthy)
}
