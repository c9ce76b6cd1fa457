//! Integration tests for worker log parsing.

use std::path::Path;

use chrono::{TimeZone, Utc};
use runner_agent::watcher::{LogParser, PatternError, WatcherError};
use tempfile::TempDir;

/// Excerpt of a runner worker log, trimmed to the lines that matter.
const WORKER_LOG: &str = r#"[2024-03-05 14:02:11Z INFO HostContext] Well known directory 'Bin': '/home/runner/actions-runner/bin'
[2024-03-05 14:02:11Z INFO Worker] Version: 2.314.1
[2024-03-05 14:02:11Z INFO Worker] Waiting to receive the job message from the channel.
[2024-03-05 14:02:12Z INFO Worker] Job message:
 {
   "fileTable": [
     ".github/workflows/build-and-test.yml"
   ],
   "variables": {
     "system.github.repository_url": {
       "v": "https://api.github.com/repos/acme/widgets"
     },
     "github.workflow_ref": {
       "v": "acme/widgets/.github/workflows/build-and-test.yml@refs/heads/main"
     }
   }
 }
[2024-03-05 14:02:12Z INFO JobRunner] Job ID 5c1a
[2024-03-05 14:07:45Z INFO JobRunner] Job result after all job steps finish: Succeeded
[2024-03-05 14:07:46Z INFO Worker] Job completed.
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_parse_runner_worker_log() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(temp_dir.path(), "Worker_20240305-140211-utc.log", WORKER_LOG);

    let parser = LogParser::with_default_patterns().unwrap();
    let job = parser.parse_file(&path, "i-0abc123").await.unwrap();

    assert_eq!(job.instance_id, "i-0abc123");
    assert_eq!(job.organization, "acme");
    assert_eq!(job.repository, "widgets");
    assert_eq!(job.workflow, "build-and-test.yml");
    assert_eq!(
        job.start_time,
        Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 2, 11).unwrap())
    );
    assert_eq!(
        job.end_time,
        Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 46).unwrap())
    );
    assert_eq!(job.full_repository().as_deref(), Some("acme/widgets"));
    assert_eq!(job.duration().map(|d| d.num_seconds()), Some(335));
}

#[tokio::test]
async fn test_parse_enterprise_server_repository() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(
        temp_dir.path(),
        "Worker_1.log",
        "\"v\": \"https://github.example.com/api/v3/repos/platform/infra\"\n",
    );

    let parser = LogParser::with_default_patterns().unwrap();
    let job = parser.parse_file(&path, "i-1").await.unwrap();
    assert_eq!(job.organization, "platform");
    assert_eq!(job.repository, "infra");
    assert!(job.start_time.is_none());
}

#[tokio::test]
async fn test_parse_is_repeatable() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(temp_dir.path(), "Worker_1.log", WORKER_LOG);

    let parser = LogParser::with_default_patterns().unwrap();
    let first = parser.parse_file(&path, "i-1").await.unwrap();
    let second = parser.parse_file(&path, "i-1").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_crlf_log_parses_like_lf_log() {
    let temp_dir = TempDir::new().unwrap();
    let lf = write(temp_dir.path(), "Worker_1.log", WORKER_LOG);
    let crlf = write(
        temp_dir.path(),
        "Worker_2.log",
        &WORKER_LOG.replace('\n', "\r\n"),
    );

    let parser = LogParser::with_default_patterns().unwrap();
    let from_lf = parser.parse_file(&lf, "i-1").await.unwrap();
    let from_crlf = parser.parse_file(&crlf, "i-1").await.unwrap();
    assert_eq!(from_lf, from_crlf);
}

#[tokio::test]
async fn test_malformed_timestamp_fails_whole_file() {
    let temp_dir = TempDir::new().unwrap();
    let contents = format!("{WORKER_LOG}[2024-03-05 25:00:00Z INFO Worker] Exiting\n");
    let path = write(temp_dir.path(), "Worker_1.log", &contents);

    let parser = LogParser::with_default_patterns().unwrap();
    let err = parser.parse_file(&path, "i-1").await.unwrap_err();

    match err {
        WatcherError::Parse {
            path: err_path,
            line,
            source,
        } => {
            assert_eq!(err_path, path);
            assert_eq!(line, WORKER_LOG.lines().count() + 1);
            assert!(matches!(source, PatternError::MalformedTimestamp { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}
