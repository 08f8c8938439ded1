use clap::Parser;
use finance_complaint_ingest::cli::{Cli, Commands};
use finance_complaint_ingest::config::ConfigError;
use finance_complaint_ingest::IngestionConfig;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_yaml_file_loads_all_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ingest.yaml");
    std::fs::write(
        &path,
        "\
artifact_dir: /srv/artifacts
source_url: http://mirror.test/?from=<fromdate>&to=<todate>
envelope_field: null
file_name: complaints
min_start_date: 2015-01-01
max_retries: 2
concurrency: 8
request_timeout_secs: 10
initial_backoff_ms: 100
max_backoff_ms: 1000
hint_padding_secs: 1
max_hint_wait_secs: 30
retry_deadline_secs: 0
dedup_key: complaint_id
",
    )
    .unwrap();

    let config = IngestionConfig::from_yaml_file(&path).unwrap();
    assert_eq!(config.artifact_dir, PathBuf::from("/srv/artifacts"));
    assert_eq!(config.envelope_field, None);
    assert_eq!(config.file_name, "complaints");
    assert_eq!(config.concurrency, 8);
    assert_eq!(config.retry_policy().retry_deadline, None);
    assert_eq!(config.dedup_key.as_deref(), Some("complaint_id"));
}

#[test]
fn test_missing_file_is_read_error() {
    let err = IngestionConfig::from_yaml_file(&PathBuf::from("/definitely/not/here.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_parse_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "concurrency: many\n").unwrap();

    match IngestionConfig::from_yaml_file(&path).unwrap_err() {
        ConfigError::Parse { path: reported, .. } => {
            assert_eq!(reported, path.display().to_string())
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_command_line_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ingest.yaml");
    std::fs::write(&path, "artifact_dir: /from/file\nmax_retries: 2\n").unwrap();
    let config_arg = path.display().to_string();

    let cli = Cli::parse_from([
        "finance-complaint-ingest",
        "--config",
        config_arg.as_str(),
        "--artifact-dir",
        "/from/flag",
        "ingest",
        "--max-retries",
        "7",
        "--concurrency",
        "3",
        "--dedup-key",
        "complaint_id",
    ]);

    let mut config = cli.load_config().unwrap();
    assert_eq!(config.artifact_dir, PathBuf::from("/from/flag"));
    assert_eq!(config.max_retries, 2);

    let Commands::Ingest(args) = &cli.command else {
        panic!("expected ingest command");
    };
    args.apply(&mut config);
    assert_eq!(config.max_retries, 7);
    assert_eq!(config.concurrency, 3);
    assert_eq!(config.dedup_key.as_deref(), Some("complaint_id"));
}
