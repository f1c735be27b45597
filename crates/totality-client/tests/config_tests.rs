use test_utils::temp_yaml;
use totality_client::{AutoFlush, ClientConfig, CollectionType, ErrorKind, FailurePolicy, Totality};

#[test]
fn test_client_from_yaml_file() {
    let file = temp_yaml(
        r#"
api_key: from-file
base_url: http://localhost:3000/dev
request_timeout_secs: 5
flush:
  threshold: 10
  auto_flush: always
"#,
    );

    let config = ClientConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.flush.threshold, 10);
    assert_eq!(config.flush.auto_flush, AutoFlush::Always);
    assert_eq!(config.flush.on_failure, FailurePolicy::Discard);
    assert_eq!(
        config.endpoint(CollectionType::Nodes),
        "http://localhost:3000/dev/observations/nodes"
    );

    let client = Totality::new(config).unwrap();
    assert_eq!(client.api_key(), Some("from-file"));
}

#[test]
fn test_missing_yaml_file_is_config_error() {
    let err = ClientConfig::from_yaml_file("/nonexistent/totality.yaml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_empty_yaml_uses_defaults() {
    let file = temp_yaml("{}\n");
    let config = ClientConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config, ClientConfig::default());
}
