//! BatchScheduler against a real client and mock server

mod common;

use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use searchvol::client::Source;
use searchvol::scheduler::{BatchProgress, BatchScheduler, SchedulerConfig};

use common::{client, item, mount_keyword};

#[tokio::test]
async fn test_slow_keyword_keeps_its_slot() {
    let server = MockServer::start().await;

    // The first keyword answers last
    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(query_param("hintKeywords", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "keywordList": [item("slow", json!(9), json!(9))] }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_keyword(&server, "fast", 1, 1, &[]).await;
    mount_keyword(&server, "faster", 2, 2, &[]).await;

    let (client, _) = client(&server);
    let scheduler = BatchScheduler::new(
        client,
        SchedulerConfig {
            concurrency: 3,
            batch_size: 3,
            pacing_delay: Duration::ZERO,
        },
    );

    let results = scheduler.run(["slow", "fast", "faster"], |_| {}).await;

    let totals: Vec<_> = results.iter().map(|r| r.volume.total()).collect();
    assert_eq!(totals, vec![18, 2, 4]);
}

#[tokio::test]
async fn test_failures_stay_in_place() {
    let server = MockServer::start().await;
    mount_keyword(&server, "good", 3, 4, &[]).await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(query_param("hintKeywords", "bad"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (client, _) = client(&server);
    let scheduler = BatchScheduler::new(client, common::fast_scheduler());

    let results = scheduler.run(["good", "bad", "good"], |_| {}).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].volume.total(), 7);
    assert!(matches!(results[1].source, Source::Fallback { .. }));
    assert!(results[1].volume.is_zero());
    assert_eq!(results[2].volume.total(), 7);
}

#[tokio::test]
async fn test_progress_ticks_per_keyword() {
    let server = MockServer::start().await;
    for keyword in ["a", "b", "c", "d", "e"] {
        mount_keyword(&server, keyword, 1, 1, &[]).await;
    }

    let (client, _) = client(&server);
    let scheduler = BatchScheduler::new(client, common::fast_scheduler());
    let ticks = Arc::new(Mutex::new(Vec::<BatchProgress>::new()));

    let sink = ticks.clone();
    scheduler
        .run(["a", "b", "c", "d", "e"], move |p| sink.lock().unwrap().push(p))
        .await;

    let ticks = ticks.lock().unwrap();
    let completed: Vec<_> = ticks.iter().map(|p| p.completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5]);
    assert_eq!(ticks.last().unwrap().percent(), 100);
}

/// Pacing applies between batches, never after the last
#[tokio::test]
async fn test_pacing_delay_between_batches() {
    let server = MockServer::start().await;
    for keyword in ["a", "b", "c", "d"] {
        mount_keyword(&server, keyword, 1, 1, &[]).await;
    }

    let (client, _) = client(&server);
    let scheduler = BatchScheduler::new(
        client,
        SchedulerConfig {
            concurrency: 2,
            batch_size: 2,
            pacing_delay: Duration::from_millis(300),
        },
    );

    let started = Instant::now();
    let results = scheduler.run(["a", "b", "c", "d"], |_| {}).await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 4);
    assert!(elapsed >= Duration::from_millis(300), "paced once: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "not paced twice: {elapsed:?}");
}
