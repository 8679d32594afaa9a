use serde_json::Value;
use std::collections::BTreeSet;

use crate::config::TimestampUnit;
use crate::error::{CheckError, Result};
use crate::scanner::RemoteEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Blacklisted,
    Fresh,
    Stale { age_secs: i64 },
}

/// Decides whether listed entries are stale. `now` is fixed at construction
/// so every directory in a run is judged against the same instant.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    threshold_secs: i64,
    unit: TimestampUnit,
    now_secs: i64,
}

impl Classifier {
    pub fn new(threshold_secs: i64, unit: TimestampUnit, now_secs: i64) -> Self {
        Self {
            threshold_secs,
            unit,
            now_secs,
        }
    }

    pub fn at_now(threshold_secs: i64, unit: TimestampUnit) -> Self {
        Self::new(threshold_secs, unit, chrono::Utc::now().timestamp())
    }

    pub fn classify(&self, blacklist: &BTreeSet<String>, entry: &RemoteEntry) -> Result<Verdict> {
        if blacklist.contains(&entry.name) {
            return Ok(Verdict::Blacklisted);
        }
        let raw = parse_timestamp(&entry.name, &entry.modification_time)?;
        let modified_secs = match self.unit {
            TimestampUnit::Milliseconds => raw.div_euclid(1000),
            TimestampUnit::Seconds => raw,
        };
        let age_secs = self.now_secs.saturating_sub(modified_secs);
        if age_secs > self.threshold_secs {
            Ok(Verdict::Stale { age_secs })
        } else {
            Ok(Verdict::Fresh)
        }
    }

    #[cfg(test)]
    pub fn is_stale(&self, blacklist: &BTreeSet<String>, entry: &RemoteEntry) -> Result<bool> {
        Ok(matches!(self.classify(blacklist, entry)?, Verdict::Stale { .. }))
    }
}

/// Accepts JSON integers, integral floats and strings holding an integer.
pub fn parse_timestamp(entry: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e18).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CheckError::InvalidTimestamp {
        entry: entry.to_string(),
        raw: value.to_string(),
    })
}
