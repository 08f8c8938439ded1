use chrono::NaiveDate;
use finance_complaint_ingest::downloader::DownloadTask;
use finance_complaint_ingest::output::{dataset_file_name, diagnostics_path, raw_file_name};
use finance_complaint_ingest::DateInterval;
use std::collections::HashSet;
use std::path::Path;

fn interval(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateInterval {
    DateInterval {
        start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
        end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
    }
}

#[test]
fn test_raw_names_unique_per_interval() {
    let intervals = finance_complaint_ingest::plan_intervals(
        NaiveDate::from_ymd_opt(2011, 12, 1).unwrap(),
        NaiveDate::from_ymd_opt(2016, 3, 9).unwrap(),
    )
    .unwrap();
    let names: HashSet<String> = intervals
        .iter()
        .map(|interval| raw_file_name("finance_complaint", interval))
        .collect();
    assert_eq!(names.len(), intervals.len());
}

#[test]
fn test_dataset_name_is_jsonl() {
    assert_eq!(dataset_file_name("finance_complaint"), "finance_complaint.jsonl");
    assert_eq!(dataset_file_name("a/b"), "a_b.jsonl");
}

#[test]
fn test_diagnostics_keyed_by_output_file_name() {
    let task = DownloadTask::new(
        "http://source.test/a",
        "/art/raw/finance_complaint_2012-01-01_2012-02-01.json",
        3,
    )
    .with_interval(interval((2012, 1, 1), (2012, 2, 1)));

    assert_eq!(
        diagnostics_path(Path::new("/art/failed"), &task),
        Path::new("/art/failed/finance_complaint_2012-01-01_2012-02-01.json")
    );
}
