use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{write, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, NamedTempFile};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn write_config(yaml: &str) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), yaml).expect("Writing temp config failed");
    config
}

fn write_bundle(dir: &Path) -> PathBuf {
    let path = dir.join("bundle.zip");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    zip.start_file("organizations.json", options).unwrap();
    zip.write_all(b"{\"id\":\"o-abc123\",\"featureSet\":\"ALL\"}\n").unwrap();
    zip.start_file("accounts.json", options).unwrap();
    zip.write_all(
        b"{\"id\":\"111111111111\",\"organizationId\":\"o-abc123\",\"childAccount\":true}\n\
          {\"id\":\"222222222222\",\"organizationId\":\"o-abc123\",\"childAccount\":true}\n",
    )
    .unwrap();
    zip.finish().unwrap();
    path
}

#[test]
fn ingest_dry_run_prints_summary() {
    let dir = tempdir().unwrap();
    let bundle = write_bundle(dir.path());
    let config = write_config("ingest:\n  max_concurrent_files: 2\n");

    Command::cargo_bin("cloudgraph")
        .expect("Binary exists")
        .arg("ingest")
        .arg("--config")
        .arg(config.path())
        .arg("--bundle")
        .arg(&bundle)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Ingested 3 records from 2 files")
                .and(predicate::str::contains("dry run: 3 nodes, 4 relationships")),
        );
}

#[test]
fn ingest_without_password_fails() {
    let dir = tempdir().unwrap();
    let bundle = write_bundle(dir.path());
    let config = write_config("store:\n  uri: http://127.0.0.1:9\n  username: neo4j\n");

    Command::cargo_bin("cloudgraph")
        .expect("Binary exists")
        .current_dir(dir.path())
        .env_remove("CLOUDGRAPH_STORE_PASSWORD")
        .arg("ingest")
        .arg("--config")
        .arg(config.path())
        .arg("--bundle")
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CLOUDGRAPH_STORE_PASSWORD"));
}

#[test]
fn ingest_with_missing_config_fails() {
    Command::cargo_bin("cloudgraph")
        .expect("Binary exists")
        .args(["ingest", "--config", "/nonexistent/config.yaml", "--bundle", "b.zip", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn check_reports_reachable_store() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/db/neo4j/tx/commit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"columns": ["1"], "data": [{"row": [1]}]}],
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    let config = write_config(&format!(
        "store:\n  uri: {}\n  username: neo4j\n",
        server.uri()
    ));

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("cloudgraph")
            .expect("Binary exists")
            .env("CLOUDGRAPH_STORE_PASSWORD", "secret")
            .arg("check")
            .arg("--config")
            .arg(config.path())
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("is reachable"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use cloudgraph::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Check {
            config: PathBuf::from("dummy.yaml"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
