//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use searchvol::cache::VolumeCache;
use searchvol::client::VolumeClient;
use searchvol::config::ApiConfig;
use searchvol::jobs::JobRunner;
use searchvol::scheduler::SchedulerConfig;

pub const ACCESS_KEY: &str = "test-access";
pub const SECRET_KEY: &str = "test-secret";
pub const CUSTOMER_ID: &str = "424242";

/// API configuration pointing at a mock server
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        access_key: ACCESS_KEY.to_string(),
        secret_key: SECRET_KEY.to_string(),
        customer_id: CUSTOMER_ID.to_string(),
        base_url: base_url.to_string(),
        request_timeout_secs: 1,
        ..Default::default()
    }
}

/// Client with a fresh cache
pub fn client(server: &MockServer) -> (Arc<VolumeClient>, Arc<VolumeCache>) {
    let cache = Arc::new(VolumeCache::new());
    let client = VolumeClient::new(&api_config(&server.uri()), cache.clone()).unwrap();
    (Arc::new(client), cache)
}

/// Scheduler settings that keep tests fast
pub fn fast_scheduler() -> SchedulerConfig {
    SchedulerConfig {
        concurrency: 4,
        batch_size: 3,
        pacing_delay: Duration::from_millis(10),
    }
}

/// Runner over a real client talking to `server`
#[allow(dead_code)]
pub fn runner(server: &MockServer) -> (JobRunner, Arc<VolumeCache>) {
    let (client, cache) = client(server);
    (JobRunner::with_lookup(client, fast_scheduler()), cache)
}

/// One `keywordList` entry
pub fn item(keyword: &str, pc: Value, mobile: Value) -> Value {
    json!({
        "relKeyword": keyword,
        "monthlyPcQcCnt": pc,
        "monthlyMobileQcCnt": mobile,
        "compIdx": "중간"
    })
}

/// Mount a successful response for `keyword`; related terms follow the
/// primary entry with small counts
#[allow(dead_code)]
pub async fn mount_keyword(
    server: &MockServer,
    keyword: &str,
    pc: u64,
    mobile: u64,
    related: &[&str],
) {
    let mut list = vec![item(keyword, json!(pc), json!(mobile))];
    list.extend(related.iter().map(|r| item(r, json!(1), json!(1))));

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(query_param("hintKeywords", keyword))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keywordList": list })))
        .mount(server)
        .await;
}
