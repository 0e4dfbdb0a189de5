use std::time::{Duration, Instant};

use futures::StreamExt;
use hyper::StatusCode;
use rstest::rstest;
use verity_client::{
    ChannelError, ChannelEvent, ChannelOpener, EventStreamOpener, VerityClient,
    VerityClientConfig,
};
use verity_prover_fixture::{ProofMode, FIXTURE_NOTARY_PUB_KEY};
use verity_tests_integration::{closed_port, start_prover};

const TARGET_URL: &str = "https://jsonplaceholder.typicode.com/posts";

fn client(prover_url: String, throw_on_error: bool, proof_timeout_ms: u64) -> VerityClient {
    let config = VerityClientConfig::builder()
        .prover_url(prover_url)
        .throw_on_error(throw_on_error)
        .proof_timeout_ms(proof_timeout_ms)
        .gate_timeout_ms(1000)
        .build()
        .unwrap();
    VerityClient::new(config)
}

#[tokio::test]
async fn test_get_notary_info() {
    let prover = start_prover(ProofMode::Prove).await.unwrap();

    let info = client(prover.url(), false, 3000)
        .get_notary_info()
        .await
        .unwrap();

    assert_eq!(info.git_commit_hash.len(), 40);
    assert!(info.public_key.starts_with("-----BEGIN PUBLIC KEY"));
}

#[rstest]
#[case::lenient(false)]
#[case::strict(true)]
#[tokio::test]
async fn test_get_with_proof(#[case] throw_on_error: bool) {
    let prover = start_prover(ProofMode::Prove).await.unwrap();

    let response = client(prover.url(), throw_on_error, 3000)
        .get(TARGET_URL)
        .redact("res:body:dolor")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.notary_pub_key.as_deref(), Some(FIXTURE_NOTARY_PUB_KEY));

    let requests = prover.fixture.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target_url, TARGET_URL);
    assert_eq!(requests[0].redacted.as_deref(), Some("res:body:dolor"));
    assert_eq!(
        response.proof,
        Some(format!("proof-for-{}", requests[0].request_id))
    );
}

#[tokio::test]
async fn test_post_json_with_proof() {
    let prover = start_prover(ProofMode::Prove).await.unwrap();
    let client = client(prover.url(), true, 3000);

    let response = client
        .post(TARGET_URL)
        .json(&serde_json::json!({"userId": 1000, "firstName": "John"}))
        .redact("req:body:firstName, res:body:firstName")
        .await
        .unwrap();

    assert!(response.has_proof());
    let echo: serde_json::Value = response.json().unwrap();
    assert_eq!(echo["method"], "POST");

    let requests = prover.fixture.requests();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["firstName"], "John");
}

#[tokio::test]
async fn test_sequential_requests_get_distinct_proofs() {
    let prover = start_prover(ProofMode::Prove).await.unwrap();
    let client = client(prover.url(), true, 3000);

    let first = client.get(TARGET_URL).await.unwrap();
    let second = client.get(TARGET_URL).await.unwrap();

    assert_ne!(first.proof, second.proof);
    let requests = prover.fixture.requests();
    assert_ne!(requests[0].request_id, requests[1].request_id);
}

#[tokio::test]
async fn test_timeout_without_proof() {
    let prover = start_prover(ProofMode::Never).await.unwrap();

    let start = Instant::now();
    let response = client(prover.url(), false, 500)
        .get(TARGET_URL)
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(!response.has_proof());
    assert!(start.elapsed() < Duration::from_secs(3));

    let err = client(prover.url(), true, 500)
        .get(TARGET_URL)
        .await
        .unwrap_err();
    assert!(err.is_proof_timeout());
}

#[tokio::test]
async fn test_stream_closed_without_proof() {
    let prover = start_prover(ProofMode::Close).await.unwrap();

    let err = client(prover.url(), true, 3000)
        .get(TARGET_URL)
        .await
        .unwrap_err();

    assert!(err.is_proof_stream());
}

#[rstest]
#[case::not_found(ProofMode::NotFound)]
#[case::plain_text(ProofMode::PlainText)]
#[tokio::test]
async fn test_rejected_proof_stream(#[case] mode: ProofMode) {
    let prover = start_prover(mode).await.unwrap();

    let err = client(prover.url(), true, 3000)
        .get(TARGET_URL)
        .await
        .unwrap_err();
    assert!(err.is_proof_stream());

    let response = client(prover.url(), false, 3000)
        .get(TARGET_URL)
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(!response.has_proof());
}

#[tokio::test]
async fn test_event_stream_opener_reports_status() {
    let prover = start_prover(ProofMode::NotFound).await.unwrap();

    let mut channel = EventStreamOpener::new()
        .open(&format!("{}/proof/1", prover.url()))
        .unwrap();

    match channel.next().await {
        Some(Err(ChannelError::Status(status))) => assert_eq!(status, StatusCode::NOT_FOUND),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(channel.next().await.is_none());
}

#[tokio::test]
async fn test_event_stream_opener_reports_content_type() {
    let prover = start_prover(ProofMode::PlainText).await.unwrap();

    let mut channel = EventStreamOpener::new()
        .open(&format!("{}/proof/1", prover.url()))
        .unwrap();

    match channel.next().await {
        Some(Err(ChannelError::ContentType(Some(content_type)))) => {
            assert!(content_type.starts_with("text/plain"))
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(channel.next().await.is_none());
}

#[tokio::test]
async fn test_event_stream_opener_ignores_other_requests() {
    let prover = start_prover(ProofMode::Prove).await.unwrap();
    let client = client(prover.url(), true, 3000);

    let mut channel = EventStreamOpener::new()
        .open(&format!("{}/proof/id-1", prover.url()))
        .unwrap();
    assert!(matches!(channel.next().await, Some(Ok(ChannelEvent::Open))));

    // Another request's proof must not reach this channel.
    client.get(TARGET_URL).await.unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(200), channel.next())
            .await
            .is_err()
    );
}

#[rstest]
#[case::skipped(false)]
#[case::proven(true)]
#[tokio::test]
async fn test_failed_target_response(#[case] prove_failed_request: bool) {
    let prover = start_prover(ProofMode::Prove).await.unwrap();
    let client = client(prover.url(), true, 3000);

    let mut request = client.get(format!("{TARGET_URL}/status/404"));
    if prove_failed_request {
        request = request.prove_failed_request();
    }
    let response = request.await.unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.has_proof(), prove_failed_request);
}

#[tokio::test]
async fn test_unreachable_prover() {
    let addr = closed_port().await.unwrap();

    let err = client(format!("http://{addr}"), false, 3000)
        .get(TARGET_URL)
        .await
        .unwrap_err();

    assert!(err.is_http());
}
