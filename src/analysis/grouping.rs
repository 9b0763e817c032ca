//! Grouping key resolution.

use crate::config::GroupingFallback;
use crate::models::{non_blank, GroupingKey, GroupingResolution, Table};
use tracing::warn;

/// Decide which column (or synthetic bucket) rows are grouped by.
///
/// The preferred fixture column is used when it exists and holds at least
/// one non-blank value. Otherwise the station's fallback policy applies and
/// the resolution is marked as a fallback.
pub fn resolve_grouping(
    table: &Table,
    preferred: &str,
    serial_column: &str,
    fallback: &GroupingFallback,
) -> GroupingResolution {
    let usable = table.column(preferred).any(|cell| non_blank(cell).is_some());
    if usable {
        return GroupingResolution {
            key: GroupingKey::Column(preferred.to_string()),
            fell_back: false,
        };
    }

    let key = match fallback {
        GroupingFallback::SingleBucket { label } => GroupingKey::SingleBucket(label.clone()),
        GroupingFallback::SerialNumber => GroupingKey::Column(serial_column.to_string()),
        GroupingFallback::Disabled => GroupingKey::Unavailable,
    };

    if !table.is_empty() {
        warn!(
            "Fixture column `{}` is missing or empty; grouping by {}",
            preferred, key
        );
    }

    GroupingResolution {
        key,
        fell_back: true,
    }
}

/// Fixture label of every row under a resolved key. `None` drops the row.
pub fn fixture_labels<'a>(table: &'a Table, key: &'a GroupingKey) -> Vec<Option<&'a str>> {
    match key {
        GroupingKey::Column(name) => match table.column_index(name) {
            Some(index) => table
                .rows
                .iter()
                .map(|row| non_blank(row[index].as_deref()))
                .collect(),
            None => vec![None; table.len()],
        },
        GroupingKey::SingleBucket(label) => vec![Some(label.as_str()); table.len()],
        GroupingKey::Unavailable => vec![None; table.len()],
    }
}
