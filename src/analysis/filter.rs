//! Row selection ahead of analysis: date range, fixture and serial search.

use super::timestamp::parse_date;
use crate::models::{non_blank, Table};
use chrono::NaiveDate;

/// Which rows of a station's table take part in an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Inclusive date range on the station's timestamp column.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Exact fixture id on the station's fixture column.
    pub fixture: Option<String>,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.fixture.is_none()
    }

    /// Returns a new table with the matching rows.
    ///
    /// With a date range set, rows whose timestamp does not parse (or whose
    /// timestamp column is missing) are dropped. A fixture filter on a
    /// missing column matches nothing.
    pub fn apply(&self, table: &Table, timestamp_column: &str, fixture_column: &str) -> Table {
        if self.is_empty() {
            return table.clone();
        }

        let ts_idx = table.column_index(timestamp_column);
        let fixture_idx = table.column_index(fixture_column);
        let wanted_fixture = self.fixture.as_deref().map(str::trim);

        table.select_rows(|_, row| {
            if let Some((from, to)) = self.date_range {
                let date = ts_idx.and_then(|i| parse_date(row[i].as_deref()));
                match date {
                    Some(d) if d >= from && d <= to => {}
                    _ => return false,
                }
            }
            if let Some(wanted) = wanted_fixture {
                let actual = fixture_idx.and_then(|i| non_blank(row[i].as_deref()));
                if actual != Some(wanted) {
                    return false;
                }
            }
            true
        })
    }
}

/// Rows whose serial number contains `query`, ignoring case.
pub fn search_serial(table: &Table, serial_column: &str, query: &str) -> Table {
    let needle = query.trim().to_lowercase();
    let Some(serial_idx) = table.column_index(serial_column) else {
        return Table {
            columns: table.columns.clone(),
            rows: Vec::new(),
        };
    };

    table.select_rows(|_, row| {
        row[serial_idx]
            .as_deref()
            .map(|serial| serial.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let rows = [
            ("SN-001", "PC-01", "2024-05-01 09:00:00"),
            ("SN-002", "PC-02", "2024-05-02 09:00:00"),
            ("sn-003", "PC-01", "2024-05-03 09:00:00"),
            ("SN-104", "PC-01", "bad"),
        ];
        Table::new(
            vec![
                "SNumber".to_string(),
                "FwPC".to_string(),
                "FwStamp".to_string(),
            ],
            rows.iter()
                .map(|(sn, pc, ts)| {
                    vec![
                        Some(sn.to_string()),
                        Some(pc.to_string()),
                        Some(ts.to_string()),
                    ]
                })
                .collect(),
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let t = table();
        assert_eq!(RowFilter::default().apply(&t, "FwStamp", "FwPC"), t);
    }

    #[test]
    fn test_date_range_is_inclusive_and_drops_unparsable() {
        let filter = RowFilter {
            date_range: Some((date(2), date(3))),
            fixture: None,
        };
        let filtered = filter.apply(&table(), "FwStamp", "FwPC");
        let serials: Vec<_> = filtered.column("SNumber").flatten().collect();
        assert_eq!(serials, vec!["SN-002", "sn-003"]);
    }

    #[test]
    fn test_fixture_filter() {
        let filter = RowFilter {
            date_range: None,
            fixture: Some("PC-01".to_string()),
        };
        assert_eq!(filter.apply(&table(), "FwStamp", "FwPC").len(), 3);
        assert!(filter.apply(&table(), "FwStamp", "RfTxPC").is_empty());
    }

    #[test]
    fn test_combined_filter() {
        let filter = RowFilter {
            date_range: Some((date(1), date(31))),
            fixture: Some("PC-01".to_string()),
        };
        assert_eq!(filter.apply(&table(), "FwStamp", "FwPC").len(), 2);
    }

    #[test]
    fn test_search_serial_case_insensitive() {
        let found = search_serial(&table(), "SNumber", "sn-00");
        assert_eq!(found.len(), 3);

        let found = search_serial(&table(), "SNumber", "104");
        assert_eq!(found.len(), 1);

        let none = search_serial(&table(), "Serial", "SN");
        assert!(none.is_empty());
        assert_eq!(none.columns.len(), 3);
    }
}
