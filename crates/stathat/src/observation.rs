// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stat observations and their form-field encoding.
//!
//! An [`Observation`] is a single count or value destined for one StatHat stat. Workers turn it
//! into the form fields accepted by the `/ez` endpoint with [`Observation::to_form_fields`].

use std::collections::BTreeMap;

/// Form fields of a single post, keyed by field name.
pub type FormFields = BTreeMap<&'static str, String>;

pub const STAT_FIELD: &str = "stat";
pub const EZKEY_FIELD: &str = "ezkey";
pub const TIME_FIELD: &str = "t";
pub const COUNT_FIELD: &str = "count";
pub const VALUE_FIELD: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// The value is added to the stat's running count.
    Counter,
    /// The value is a standalone reading.
    Gauge,
}

/// One metric event queued for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub stat_key: String,
    pub user_key: String,
    pub value: f64,
    /// Seconds since the epoch. `None` (or a non-positive value) lets the server use its
    /// receive time.
    pub timestamp: Option<i64>,
    pub kind: StatKind,
}

impl Observation {
    pub fn count(stat_key: impl Into<String>, user_key: impl Into<String>, count: i64) -> Self {
        Self {
            stat_key: stat_key.into(),
            user_key: user_key.into(),
            value: count as f64,
            timestamp: None,
            kind: StatKind::Counter,
        }
    }

    pub fn value(stat_key: impl Into<String>, user_key: impl Into<String>, value: f64) -> Self {
        Self {
            stat_key: stat_key.into(),
            user_key: user_key.into(),
            value,
            timestamp: None,
            kind: StatKind::Gauge,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Encodes the observation as the form fields of an `/ez` post.
    ///
    /// `stat` and `ezkey` are always present, `t` only for a positive timestamp, and exactly one
    /// of `count` or `value` depending on the kind.
    pub fn to_form_fields(&self) -> FormFields {
        let mut fields = FormFields::new();
        fields.insert(STAT_FIELD, self.stat_key.clone());
        fields.insert(EZKEY_FIELD, self.user_key.clone());
        if let Some(timestamp) = self.timestamp.filter(|t| *t > 0) {
            fields.insert(TIME_FIELD, timestamp.to_string());
        }
        let value_field = match self.kind {
            StatKind::Counter => COUNT_FIELD,
            StatKind::Gauge => VALUE_FIELD,
        };
        fields.insert(value_field, format_float(self.value));
        fields
    }
}

/// Formats a float with the fewest digits that parse back to the same value.
///
/// Decimal exponents in `[-4, 6)` are written plainly (`213`, `2.13`, `0.0001`); anything
/// outside that range uses exponent notation with a signed, two-digit minimum exponent
/// (`1e+06`, `1.5e-05`). This is the format the StatHat API has always been sent.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let inf = if value.is_sign_positive() { "+Inf" } else { "-Inf" };
        return inf.to_string();
    }

    // `{:e}` gives the shortest round-trip digits, e.g. "1.234567e6"
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };

    if (-4..6).contains(&exponent) {
        value.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}
