//! Yield analysis.
//!
//! The pipeline for one station is: filter rows, resolve the grouping key,
//! normalize pass flags, aggregate per fixture and day, and extract the
//! serial lists per fixture. Every step is a pure function of its inputs.

pub mod aggregator;
pub mod details;
pub mod filter;
pub mod grouping;
pub mod normalize;
pub mod timestamp;

pub use aggregator::aggregate;
pub use details::details_by_fixture;
pub use filter::{search_serial, RowFilter};
pub use grouping::resolve_grouping;
pub use normalize::{normalize_pass_column, TokenVocabulary};

use crate::config::StationProfile;
use crate::models::{Station, StationReport, Table};
use chrono::Local;
use tracing::info;

/// Run the full analysis of one station over a freshly loaded table.
pub fn analyze_station(
    station: Station,
    profile: &StationProfile,
    serial_column: &str,
    table: &Table,
    filter: &RowFilter,
) -> StationReport {
    let rows = filter.apply(table, &profile.timestamp_column, &profile.fixture_column);

    let grouping = resolve_grouping(
        &rows,
        &profile.fixture_column,
        serial_column,
        &profile.fallback,
    );
    let normalized = normalize_pass_column(
        &rows,
        &profile.pass_columns,
        &TokenVocabulary::from_profile(profile),
    );
    let aggregation = aggregate(
        &rows,
        serial_column,
        &profile.timestamp_column,
        &grouping.key,
        &normalized.statuses,
    );
    let details = details_by_fixture(&rows, serial_column, &grouping.key, &normalized.statuses);

    info!(
        "{}: {} row(s), {} fixture(s), {} date(s)",
        profile.label,
        rows.len(),
        aggregation.summary.len(),
        aggregation.dates.len()
    );

    StationReport {
        station,
        label: profile.label.clone(),
        analysis_time: Local::now(),
        rows_analyzed: rows.len(),
        grouping,
        quality: normalized.stats,
        summary: aggregation.summary,
        dates: aggregation.dates,
        details,
    }
}

/// Serial search over the rows one station would analyze.
pub fn search_station(
    profile: &StationProfile,
    serial_column: &str,
    table: &Table,
    filter: &RowFilter,
    query: &str,
) -> Table {
    let rows = filter.apply(table, &profile.timestamp_column, &profile.fixture_column);
    search_serial(&rows, serial_column, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupingFallback;
    use crate::models::GroupingKey;
    use chrono::NaiveDate;

    fn history() -> Table {
        let rows = [
            ("S1", Some("PC-01"), "2024-05-03 09:00:00", "X"),
            ("S1", Some("PC-01"), "2024-05-03 09:10:00", "O"),
            ("S2", Some("PC-02"), "2024-05-03 10:00:00", "X"),
            ("S3", Some("PC-01"), "2024-05-04 10:00:00", "O"),
            ("S4", None, "2024-05-05 10:00:00", "O"),
        ];
        Table::new(
            vec![
                "SNumber".to_string(),
                "FwPC".to_string(),
                "FwStamp".to_string(),
                "FwPass".to_string(),
                "PcbPass".to_string(),
            ],
            rows.iter()
                .map(|(sn, pc, ts, flag)| {
                    vec![
                        Some(sn.to_string()),
                        pc.map(String::from),
                        Some(ts.to_string()),
                        Some(flag.to_string()),
                        None,
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_analyze_station() {
        let profile = StationProfile::builtin(Station::Fw);
        let report = analyze_station(
            Station::Fw,
            &profile,
            "SNumber",
            &history(),
            &RowFilter::default(),
        );

        assert_eq!(report.label, "Fw_Process");
        assert_eq!(report.rows_analyzed, 5);
        assert!(!report.grouping.fell_back);
        assert_eq!(report.summary.len(), 2);
        assert_eq!(report.dates.len(), 3);
        assert_eq!(report.summary["PC-01"]["2024-05-03"].false_defect_count, 1);
        assert_eq!(report.summary["PC-02"]["2024-05-03"].true_defect_count, 1);
        assert_eq!(report.details["PC-01"].passed, vec!["S1", "S3"]);
        assert_eq!(report.true_defect_total(), 1);
    }

    #[test]
    fn test_analyze_station_with_filter() {
        let profile = StationProfile::builtin(Station::Fw);
        let filter = RowFilter {
            date_range: Some((
                NaiveDate::from_ymd_opt(2024, 5, 4).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            )),
            fixture: None,
        };
        let report = analyze_station(Station::Fw, &profile, "SNumber", &history(), &filter);
        assert_eq!(report.rows_analyzed, 2);
        assert_eq!(report.dates.len(), 2);
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.true_defect_total(), 0);
    }

    #[test]
    fn test_station_without_fixture_data_uses_single_bucket() {
        // PcbMaxIrPwr is absent from this table.
        let mut profile = StationProfile::builtin(Station::Pcb);
        profile.timestamp_column = "FwStamp".to_string();
        profile.pass_columns = vec!["FwPass".to_string()];

        let report = analyze_station(
            Station::Pcb,
            &profile,
            "SNumber",
            &history(),
            &RowFilter::default(),
        );
        assert!(report.grouping.fell_back);
        assert_eq!(
            report.grouping.key,
            GroupingKey::SingleBucket("전체".to_string())
        );
        assert_eq!(report.summary["전체"]["2024-05-03"].total_tested, 2);
        assert_eq!(report.summary["전체"]["2024-05-05"].pass_count, 1);
    }

    #[test]
    fn test_disabled_fallback_yields_empty_summary() {
        let mut profile = StationProfile::builtin(Station::Pcb);
        profile.timestamp_column = "FwStamp".to_string();
        profile.fallback = GroupingFallback::Disabled;

        let report = analyze_station(
            Station::Pcb,
            &profile,
            "SNumber",
            &history(),
            &RowFilter::default(),
        );
        assert!(report.summary.is_empty());
        assert!(report.details.is_empty());
        // Dates still describe the whole input.
        assert_eq!(report.dates.len(), 3);
    }

    #[test]
    fn test_serial_number_fallback_buckets_each_serial() {
        let table = Table::new(
            vec![
                "SNumber".to_string(),
                "FwStamp".to_string(),
                "FwPass".to_string(),
            ],
            [
                ("S1", "2024-05-03 09:00:00", "X"),
                ("S1", "2024-05-03 09:10:00", "O"),
                ("S2", "2024-05-03 10:00:00", "X"),
            ]
            .iter()
            .map(|(sn, ts, flag)| {
                vec![
                    Some(sn.to_string()),
                    Some(ts.to_string()),
                    Some(flag.to_string()),
                ]
            })
            .collect(),
        );
        let mut profile = StationProfile::builtin(Station::Fw);
        profile.fallback = GroupingFallback::SerialNumber;

        let report = analyze_station(
            Station::Fw,
            &profile,
            "SNumber",
            &table,
            &RowFilter::default(),
        );

        assert!(report.grouping.fell_back);
        assert_eq!(report.grouping.key, GroupingKey::Column("SNumber".to_string()));
        assert_eq!(report.summary.keys().collect::<Vec<_>>(), vec!["S1", "S2"]);
        for days in report.summary.values() {
            assert_eq!(days["2024-05-03"].total_tested, 1);
        }

        let s1 = report.summary["S1"]["2024-05-03"];
        assert_eq!((s1.pass_count, s1.false_defect_count), (1, 1));
        let s2 = report.summary["S2"]["2024-05-03"];
        assert_eq!((s2.fail_count, s2.true_defect_count), (1, 1));

        assert_eq!(report.details.keys().collect::<Vec<_>>(), vec!["S1", "S2"]);
        assert_eq!(report.details["S1"].false_defect, vec!["S1"]);
        assert_eq!(report.details["S2"].true_defect, vec!["S2"]);
    }

    #[test]
    fn test_blank_pass_column_is_all_unknown() {
        let mut profile = StationProfile::builtin(Station::Fw);
        profile.pass_columns = vec!["PcbPass".to_string()];
        let report = analyze_station(
            Station::Fw,
            &profile,
            "SNumber",
            &history(),
            &RowFilter::default(),
        );
        let s = report.summary["PC-01"]["2024-05-03"];
        assert_eq!(s.pass_count, 0);
        assert_eq!(s.fail_count, 1);
        assert_eq!(s.true_defect_count + s.false_defect_count, 0);
        assert_eq!(report.quality.blank, 5);
    }

    #[test]
    fn test_search_station() {
        let profile = StationProfile::builtin(Station::Fw);
        let found = search_station(&profile, "SNumber", &history(), &RowFilter::default(), "s1");
        assert_eq!(found.len(), 2);
    }
}
