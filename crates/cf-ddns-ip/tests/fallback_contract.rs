//! Contract Test: Echo service fallback
//!
//! Constraints verified:
//! - The first valid answer wins and later services are not contacted
//! - Non-200 statuses, malformed bodies and unreachable hosts fall through
//! - Exhausting every service fails only with a detection error

use cf_ddns_core::traits::IpDetector;
use cf_ddns_core::{Error, IpFamily};
use cf_ddns_ip::HttpIpDetector;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn echo(server: &MockServer, route: &str, status: u16, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn first_valid_answer_wins() {
    let server = MockServer::start().await;
    echo(&server, "/one", 200, "203.0.113.5\n", 1).await;
    echo(&server, "/two", 200, "198.51.100.7", 0).await;

    let detector = HttpIpDetector::with_services(
        vec![format!("{}/one", server.uri()), format!("{}/two", server.uri())],
        Vec::new(),
    )
    .unwrap();

    assert_eq!(detector.detect(IpFamily::V4).await.unwrap(), "203.0.113.5");
}

#[tokio::test]
async fn falls_through_bad_status_and_bad_body() {
    let server = MockServer::start().await;
    echo(&server, "/down", 503, "203.0.113.9", 1).await;
    echo(&server, "/garbage", 200, "<html>rate limited</html>", 1).await;
    echo(&server, "/wrong-family", 200, "203.0.113.5", 1).await;
    echo(&server, "/good", 200, "  2001:db8::42  ", 1).await;

    let detector = HttpIpDetector::with_services(
        Vec::new(),
        vec![
            // Nothing listens on the discard port
            "http://127.0.0.1:9/".to_string(),
            format!("{}/down", server.uri()),
            format!("{}/garbage", server.uri()),
            format!("{}/wrong-family", server.uri()),
            format!("{}/good", server.uri()),
        ],
    )
    .unwrap();

    assert_eq!(detector.detect(IpFamily::V6).await.unwrap(), "2001:db8::42");
}

#[tokio::test]
async fn exhausted_services_fail_with_detection_error() {
    let server = MockServer::start().await;
    echo(&server, "/a", 404, "", 1).await;
    echo(&server, "/b", 200, "203.0.113.256", 1).await;

    let detector = HttpIpDetector::with_services(
        vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())],
        Vec::new(),
    )
    .unwrap();

    let err = detector.detect(IpFamily::V4).await.unwrap_err();
    assert!(matches!(err, Error::Detection { family: IpFamily::V4 }));

    // The other family has no services at all
    let err = detector.detect(IpFamily::V6).await.unwrap_err();
    assert!(matches!(err, Error::Detection { family: IpFamily::V6 }));
}
