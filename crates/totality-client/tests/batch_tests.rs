//! End-to-end batching tests against an in-memory transport.

use std::sync::Arc;

use serde_json::json;
use test_utils::{facility_node, full_metadata, generate_nodes};
use totality_client::{
    BatchMetadata, ClientConfig, ErrorKind, FailurePolicy, FlushOutcome, FlushPolicy,
    ObservationError, Reading, RecordingTransport, Totality,
};

fn client_with(config: ClientConfig) -> (Totality, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let client = Totality::with_transport(config, transport.clone()).unwrap();
    (client, transport)
}

fn client() -> (Totality, Arc<RecordingTransport>) {
    client_with(ClientConfig::with_api_key("test-key"))
}

#[tokio::test]
async fn test_scoped_batch_flushes_at_threshold() {
    let (client, transport) = client();
    let mut batch = client.create_nodes_collection(full_metadata());

    let mut scope = batch.scope();
    let mut flushes = Vec::new();
    for node in generate_nodes(20) {
        if let Some(outcome) = scope.add(node).await.unwrap() {
            flushes.push(outcome);
        }
    }
    assert_eq!(flushes, vec![FlushOutcome::Delivered { count: 20 }]);
    assert_eq!(scope.close().await.unwrap(), FlushOutcome::Empty);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 20);
    assert!(body.get("readings").is_none());
    assert_eq!(body["nodes"][0]["nodeId"]["030 Catalog Id"], json!(0));
    assert_eq!(body["nodes"][19]["nodeId"]["030 Catalog Id"], json!(19));
}

#[tokio::test]
async fn test_scope_below_threshold_flushes_on_close() {
    let (client, transport) = client();
    let mut batch = client.create_nodes_collection(full_metadata());

    let mut scope = batch.scope();
    for node in generate_nodes(7) {
        assert_eq!(scope.add(node).await.unwrap(), None);
    }
    assert_eq!(transport.request_count(), 0);

    assert_eq!(scope.close().await.unwrap(), FlushOutcome::Delivered { count: 7 });
    assert_eq!(transport.request_count(), 1);
    assert_eq!(batch.pending_count(), 0);
    assert!(!batch.is_scoped());
}

#[tokio::test]
async fn test_scope_over_threshold_posts_remainder_on_close() {
    let (client, transport) = client();
    let mut batch = client.create_nodes_collection(BatchMetadata::default());

    let mut scope = batch.scope();
    for node in generate_nodes(45) {
        scope.add(node).await.unwrap();
    }
    scope.close().await.unwrap();

    let sizes: Vec<usize> = transport
        .requests()
        .iter()
        .map(|r| r.body["nodes"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![20, 20, 5]);
}

#[tokio::test]
async fn test_empty_scope_makes_no_request() {
    let (client, transport) = client();
    let mut batch = client.create_nodes_collection(BatchMetadata::default());

    let scope = batch.scope();
    assert_eq!(scope.close().await.unwrap(), FlushOutcome::Empty);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_request_carries_key_url_and_metadata() {
    let (client, transport) = client();
    let mut batch = client.create_nodes_collection(full_metadata());
    batch.add(facility_node()).await.unwrap();
    batch.flush().await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(
        request.url,
        "https://totality.str8d8a.info/dev/observations/nodes"
    );
    assert_eq!(request.api_key.as_deref(), Some("test-key"));

    let body = &request.body;
    assert_eq!(body["contributor"]["username"], "system");
    assert_eq!(body["source"]["organization_type"], "government agency");
    assert_eq!(body["source"]["series_name"], "reservoir-survey-2024");
    assert_eq!(body["collectionMethod"]["transducer"], "camera - visible");
    assert_eq!(body["observedAt"], "2024-06-01T08:00:00Z");

    let node = &body["nodes"][0];
    assert_eq!(node["nodeType"], "facility");
    assert_eq!(node["nodeId"], json!({"000 Node Type": "facility"}));
    assert_eq!(node["location"]["type"], "Point");
    assert_eq!(node["location"]["coordinates"], json!([-120.0, 34.0]));
}

#[tokio::test]
async fn test_missing_api_key_sends_no_header() {
    let (client, transport) = client_with(ClientConfig::default());
    let mut batch = client.create_nodes_collection(BatchMetadata::default());
    batch.add(facility_node()).await.unwrap();
    batch.flush().await.unwrap();

    assert!(transport.requests()[0].api_key.is_none());
}

#[tokio::test]
async fn test_rejected_flush_discards_records() {
    let (client, transport) = client();
    transport.push_status(403, r#"{"message":"Forbidden"}"#);
    let mut batch = client.create_nodes_collection(BatchMetadata::default());

    for node in generate_nodes(3) {
        batch.add(node).await.unwrap();
    }
    let outcome = batch.flush().await.unwrap();
    assert_eq!(
        outcome,
        FlushOutcome::Rejected { status: 403, count: 3, requeued: false }
    );
    assert!(!outcome.is_delivered());
    assert_eq!(batch.pending_count(), 0);

    // Nothing left to resend
    assert_eq!(batch.flush().await.unwrap(), FlushOutcome::Empty);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_transport_error_propagates_and_discards() {
    let (client, transport) = client();
    transport.push_error("connection refused");
    let mut batch = client.create_nodes_collection(BatchMetadata::default());
    batch.add(facility_node()).await.unwrap();

    let err = batch.flush().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(batch.pending_count(), 0);
}

#[tokio::test]
async fn test_transport_error_with_requeue_keeps_records() {
    let config = ClientConfig {
        flush: FlushPolicy::default().with_on_failure(FailurePolicy::Requeue),
        ..ClientConfig::with_api_key("k")
    };
    let (client, transport) = client_with(config);
    transport.push_error("timed out");
    let mut batch = client.create_nodes_collection(BatchMetadata::default());
    batch.add(facility_node()).await.unwrap();

    assert!(batch.flush().await.is_err());
    assert_eq!(batch.pending_count(), 1);
    assert_eq!(batch.flush().await.unwrap(), FlushOutcome::Delivered { count: 1 });
}

#[tokio::test]
async fn test_readings_batch_rejects_unrenderable_reading() {
    let (client, transport) = client();
    let mut batch = client.create_readings_collection(BatchMetadata::default());

    let reading = Reading::new(34.0, -120.0, "celsius", 21.5).unwrap();
    let err = batch.add(reading).await.unwrap_err();
    assert!(matches!(err, ObservationError::NotImplemented(_)));
    assert_eq!(batch.pending_count(), 0);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_readings_batch_rejects_nodes() {
    let (client, _transport) = client();
    let mut batch = client.create_readings_collection(BatchMetadata::default());

    let err = batch.add(facility_node()).await.unwrap_err();
    assert!(matches!(
        err,
        ObservationError::CollectionMismatch { record: "node", collection: "readings" }
    ));
}

#[tokio::test]
async fn test_custom_threshold() {
    let config = ClientConfig {
        flush: FlushPolicy::default().with_threshold(3),
        ..ClientConfig::with_api_key("k")
    };
    let (client, transport) = client_with(config);
    let mut batch = client.create_nodes_collection(BatchMetadata::default());

    let mut scope = batch.scope();
    for node in generate_nodes(6) {
        scope.add(node).await.unwrap();
    }
    assert_eq!(transport.request_count(), 2);
    assert_eq!(scope.close().await.unwrap(), FlushOutcome::Empty);
}

#[tokio::test]
async fn test_batch_can_be_scoped_again() {
    let (client, transport) = client();
    let mut batch = client.create_nodes_collection(BatchMetadata::default());

    for round in 0..2 {
        let mut scope = batch.scope();
        for node in generate_nodes(2) {
            scope.add(node).await.unwrap();
        }
        scope.close().await.unwrap();
        assert_eq!(transport.request_count(), round + 1);
    }
}

#[tokio::test]
async fn test_out_of_vocabulary_metadata_never_reaches_a_batch() {
    let err = BatchMetadata::builder()
        .username("system")
        .transducer("radar")
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let (client, transport) = client();
    let metadata = BatchMetadata::builder().transducer("camera - IR").build().unwrap();
    let mut batch = client.create_nodes_collection(metadata);
    assert!(batch.metadata().validate().is_ok());
    batch.add(facility_node()).await.unwrap();
    batch.flush().await.unwrap();

    assert_eq!(
        transport.requests()[0].body["collectionMethod"]["transducer"],
        "camera - IR"
    );
}
