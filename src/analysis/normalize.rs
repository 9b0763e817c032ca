//! Pass-flag normalization.
//!
//! Each station records its verdict in a differently named column with
//! free-form tokens. This module picks the station's column and maps every
//! row onto [`PassStatus`] without touching the input table.

use crate::config::StationProfile;
use crate::models::{NormalizationStats, PassStatus, Table};
use tracing::{debug, warn};

/// The pass/fail token vocabulary of one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenVocabulary {
    pass: Vec<String>,
    fail: Vec<String>,
}

impl TokenVocabulary {
    pub fn new(pass: &[String], fail: &[String]) -> Self {
        let canon = |tokens: &[String]| -> Vec<String> {
            tokens
                .iter()
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect()
        };
        Self {
            pass: canon(pass),
            fail: canon(fail),
        }
    }

    pub fn from_profile(profile: &StationProfile) -> Self {
        Self::new(&profile.pass_tokens, &profile.fail_tokens)
    }

    /// Classify an already normalized token.
    pub fn classify(&self, token: &str) -> PassStatus {
        if self.pass.iter().any(|t| t == token) {
            PassStatus::Pass
        } else if self.fail.iter().any(|t| t == token) {
            PassStatus::Fail
        } else {
            PassStatus::Unknown
        }
    }
}

impl Default for TokenVocabulary {
    fn default() -> Self {
        Self::new(&["O".to_string()], &["X".to_string()])
    }
}

/// Normalized pass flags, one entry per table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPassColumn {
    /// Trimmed, upper-cased tokens; empty for anything outside the vocabulary.
    pub tokens: Vec<String>,
    pub statuses: Vec<PassStatus>,
    pub stats: NormalizationStats,
}

/// Trim and upper-case a raw pass-flag cell. Null becomes empty.
pub fn normalize_token(raw: Option<&str>) -> String {
    raw.unwrap_or("").trim().to_uppercase()
}

/// Derive the pass status of every row from the first candidate column present.
pub fn normalize_pass_column(
    table: &Table,
    candidates: &[String],
    vocabulary: &TokenVocabulary,
) -> NormalizedPassColumn {
    let source_column = candidates.iter().find(|c| table.has_column(c)).cloned();

    let mut stats = NormalizationStats {
        source_column: source_column.clone(),
        rows: table.len(),
        ..NormalizationStats::default()
    };

    let Some(ref column) = source_column else {
        debug!("No pass column among {:?}; all rows are UNKNOWN", candidates);
        stats.blank = table.len();
        return NormalizedPassColumn {
            tokens: vec![String::new(); table.len()],
            statuses: vec![PassStatus::Unknown; table.len()],
            stats,
        };
    };

    let mut tokens = Vec::with_capacity(table.len());
    let mut statuses = Vec::with_capacity(table.len());

    for raw in table.column(column) {
        let token = normalize_token(raw);
        let status = vocabulary.classify(&token);

        if token.is_empty() {
            stats.blank += 1;
        } else if status == PassStatus::Unknown {
            stats.unknown_tokens += 1;
        }

        tokens.push(if status == PassStatus::Unknown {
            String::new()
        } else {
            token
        });
        statuses.push(status);
    }

    if stats.unknown_tokens > 0 {
        warn!(
            "{} value(s) in `{}` are neither pass nor fail tokens; counted as UNKNOWN",
            stats.unknown_tokens, column
        );
    }

    NormalizedPassColumn {
        tokens,
        statuses,
        stats,
    }
}
