//! End-to-end job scenarios against a mock keyword tool

mod common;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use searchvol::error::JobError;
use searchvol::models::{JobId, JobStatus, KeywordVolume, LookupOptions};

use common::{item, mount_keyword, runner};

/// `["Dune", "", "Dune"]` → two identical results from one external call
#[tokio::test]
async fn test_duplicate_keywords_single_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(query_param("hintKeywords", "Dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keywordList": [item("DUNE", json!("1,234"), json!(5678))]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (runner, _) = runner(&server);
    let id = runner.submit(["Dune", "", "Dune"], LookupOptions::default());
    let view = runner.wait(&id).await.unwrap();

    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress, 100);
    assert_eq!(view.total, 2);

    let results = runner.results(&id).unwrap();
    let expected = KeywordVolume::new("Dune", 1234, 5678);
    assert_eq!(results, vec![expected.clone(), expected]);
    assert_eq!(results[0].total(), 6912);
}

/// Results follow submission order with one entry per non-empty input
#[tokio::test]
async fn test_results_in_submission_order() {
    let server = MockServer::start().await;
    let keywords = ["토지", "태백산맥", "아리랑", "혼불", "객주", "장길산", "임꺽정"];
    for (i, keyword) in keywords.iter().enumerate() {
        mount_keyword(&server, keyword, i as u64 * 10, 1, &[]).await;
    }

    let (runner, _) = runner(&server);
    let mut input: Vec<String> = keywords.iter().map(|k| format!("  {k} ")).collect();
    input.insert(3, "   ".to_string());

    let id = runner.submit(&input, LookupOptions::default());
    runner.wait(&id).await.unwrap();
    let results = runner.results(&id).unwrap();

    let names: Vec<_> = results.iter().map(|r| r.keyword()).collect();
    assert_eq!(names, keywords);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.pc(), i as u64 * 10);
        assert_eq!(result.total(), result.pc() + result.mobile());
    }
}

/// An upstream that always fails still yields a completed job of zeros
#[tokio::test]
async fn test_all_failures_complete_with_zeros() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (runner, cache) = runner(&server);
    let id = runner.submit(["a", "b", "c", "d"], LookupOptions::with_related());
    let view = runner.wait(&id).await.unwrap();

    assert_eq!(view.status, JobStatus::Completed);
    let results = runner.results(&id).unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(KeywordVolume::is_zero));
    assert!(results.iter().all(|r| r.related().is_empty()));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_unknown_job_not_found() {
    let server = MockServer::start().await;
    let (runner, _) = runner(&server);
    let id = JobId::new();

    assert_eq!(runner.status(&id), Err(JobError::NotFound(id.to_string())));
    assert_eq!(runner.results(&id), Err(JobError::NotFound(id.to_string())));
}

#[tokio::test]
async fn test_empty_submission_completes_immediately() {
    let server = MockServer::start().await;
    let (runner, _) = runner(&server);

    let id = runner.submit(Vec::<String>::new(), LookupOptions::default());
    let view = runner.wait(&id).await.unwrap();

    assert_eq!(view.status, JobStatus::Completed);
    assert_eq!(view.progress, 100);
    assert!(runner.results(&id).unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

/// Related mode with three related terms → three nested entries, each
/// fetched once and cached
#[tokio::test]
async fn test_related_mode_three_terms() {
    let server = MockServer::start().await;
    let related = ["dune part two", "dune novel", "듄"];

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(query_param("hintKeywords", "dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keywordList": [
                item("dune", json!(100), json!(200)),
                item("dune part two", json!(1), json!(1)),
                item("dune novel", json!(1), json!(1)),
                item("듄", json!(1), json!(1)),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    for (i, term) in related.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/keywordstool"))
            .and(query_param("hintKeywords", *term))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keywordList": [item(term, json!(i as u64 + 1), json!("< 10"))]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (runner, cache) = runner(&server);
    let id = runner.submit(["dune"], LookupOptions::with_related());
    runner.wait(&id).await.unwrap();

    let results = runner.results(&id).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].total(), 300);

    let nested = results[0].related();
    assert_eq!(nested.len(), 3);
    for (i, (entry, term)) in nested.iter().zip(related).enumerate() {
        assert_eq!(entry.keyword(), term);
        assert_eq!(entry.pc(), i as u64 + 1);
        assert_eq!(entry.mobile(), 0);
        assert!(entry.related().is_empty());
        assert!(cache.contains(term));
    }

    // JSON view nests the related rows
    let json = serde_json::to_value(&results[0]).unwrap();
    assert_eq!(json["related"].as_array().unwrap().len(), 3);
}

/// A second job reuses the cache built by the first
#[tokio::test]
async fn test_cache_shared_across_jobs() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keywordList": [item("emma", json!(7), json!(8))]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (runner, _) = runner(&server);
    let first = runner.submit(["emma"], LookupOptions::default());
    runner.wait(&first).await.unwrap();
    let second = runner.submit(["emma"], LookupOptions::default());
    runner.wait(&second).await.unwrap();

    assert_eq!(
        runner.results(&first).unwrap(),
        runner.results(&second).unwrap()
    );
}
