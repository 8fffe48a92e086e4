//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full harvest cycle end-to-end.

use contact_harvester::config::Config;
use contact_harvester::crawler::{Coordinator, StopReason};
use contact_harvester::storage::{RunStatus, SqliteStorage, Storage};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to a database inside `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.request_delay_ms = 0;
    config.crawler.backoff_base_ms = 1;
    config.crawler.retry_attempts = 0;
    config.crawler.connect_timeout_ms = 2_000;
    config.crawler.read_timeout_ms = 2_000;
    config.crawler.robots_timeout_ms = 2_000;
    config.crawler.probe_common_pages = false;
    config.render.enabled = false;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.database_path = dir
        .path()
        .join("harvest.db")
        .to_string_lossy()
        .into_owned();
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn open(config: &Config) -> SqliteStorage {
    SqliteStorage::new(std::path::Path::new(&config.output.database_path))
        .expect("Failed to open database")
}

fn seed_of(server: &MockServer) -> Url {
    Url::parse(&format!("{}/", server.uri())).expect("Failed to parse server URI")
}

#[tokio::test]
async fn test_full_harvest_single_site() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Faculté des Sciences</title></head><body>
           <a href="mailto:k.said@univ-x.dz">Dr K. Said</a>
           <p>Secrétariat: contact@univ-x.dz</p>
           <a href="/annuaire">Annuaire</a>
           </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/annuaire",
        r#"<html><body>
           <p>Pr. Amina Yahiaoui, a.yahiaoui@univ-x.dz, bureau 12</p>
           <p>Also reachable as K.Said@univ-x.dz</p>
           </body></html>"#,
    )
    .await;

    let coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run(&[seed_of(&server)]).await.unwrap();

    assert_eq!(summary.failed_seeds, 0);
    assert_eq!(summary.seeds[0].pages_fetched, 2);
    assert_eq!(summary.seeds[0].stop_reason, StopReason::FrontierEmpty);
    assert_eq!(summary.raw_written, 3);

    let storage = open(&config);
    let raw = storage.load_raw().unwrap();
    assert!(raw.iter().all(|r| r.identifier != "contact@univ-x.dz"));
    let mailto = raw
        .iter()
        .find(|r| r.identifier == "k.said@univ-x.dz")
        .expect("mailto record missing");
    assert_eq!(mailto.channel, "mailto_link");
    assert_eq!(mailto.page_title, "Faculté des Sciences");
    assert_eq!(mailto.http_status, Some(200));

    let canonical = storage.load_canonical().unwrap();
    let identifiers: Vec<&str> = canonical.iter().map(|c| c.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["a.yahiaoui@univ-x.dz", "k.said@univ-x.dz"]);
    assert_eq!(canonical[1].sources.len(), 2);

    let run = storage.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<a href="/private/staff">Staff</a><a href="/public">Public</a>"#,
    )
    .await;
    mount_page(&server, "/public", "<p>s.hamdi@univ-x.dz</p>").await;
    Mock::given(method("GET"))
        .and(path("/private/staff"))
        .respond_with(html("<p>k.said@univ-x.dz</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator.run(&[seed_of(&server)]).await.unwrap();

    assert_eq!(summary.seeds[0].pages_fetched, 2);
    let canonical = open(&config).load_canonical().unwrap();
    assert_eq!(canonical.len(), 1);
    assert_eq!(canonical[0].identifier, "s.hamdi@univ-x.dz");
}

#[tokio::test]
async fn test_page_budget_is_respected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.max_pages_per_seed = 3;
    config.crawler.worker_pool_size = 2;

    let links: String = (0..12)
        .map(|i| format!(r#"<a href="/dept{}">Dept {}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    Mock::given(method("GET"))
        .respond_with(html("<p>nothing here</p>"))
        .mount(&server)
        .await;

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let summary = coordinator.run(&[seed_of(&server)]).await.unwrap();

    assert_eq!(summary.seeds[0].pages_fetched, 3);
    assert_eq!(summary.seeds[0].stop_reason, StopReason::BudgetReached);
}

#[tokio::test]
async fn test_failing_seed_does_not_stop_run() {
    let broken = MockServer::start().await;
    let healthy = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.crawler.max_consecutive_failures = 1;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;
    mount_page(&healthy, "/", "<p>r.benali@univ-y.dz</p>").await;

    let coordinator = Coordinator::new(config.clone(), "hash").unwrap();
    let summary = coordinator
        .run(&[seed_of(&broken), seed_of(&healthy)])
        .await
        .unwrap();

    assert_eq!(summary.seeds.len(), 2);
    assert_eq!(summary.seeds[0].stop_reason, StopReason::FailureThreshold);
    assert_eq!(summary.seeds[0].pages_fetched, 0);
    assert_eq!(summary.seeds[1].pages_fetched, 1);

    let canonical = open(&config).load_canonical().unwrap();
    assert_eq!(canonical.len(), 1);
    assert_eq!(canonical[0].domain_part, "univ-y.dz");
}

#[tokio::test]
async fn test_second_run_appends_raw_and_rebuilds_canonical() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);

    mount_page(&server, "/", "<p>k.said@univ-x.dz, a.yahiaoui@univ-x.dz</p>").await;

    for _ in 0..2 {
        let coordinator = Coordinator::new(config.clone(), "hash").unwrap();
        coordinator.run(&[seed_of(&server)]).await.unwrap();
    }

    let storage = open(&config);
    assert_eq!(storage.count_raw().unwrap(), 4);
    assert_eq!(storage.count_canonical().unwrap(), 2);

    let canonical = storage.load_canonical().unwrap();
    assert_eq!(canonical[0].sources.len(), 1);
    let raw = storage.load_raw().unwrap();
    let first = raw
        .iter()
        .filter(|r| r.identifier == "k.said@univ-x.dz")
        .map(|r| r.found_at.as_str())
        .min()
        .unwrap();
    assert_eq!(canonical[1].first_seen, first);
}
