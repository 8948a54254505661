use courtside::backoff::JitterMode;
use courtside::config::{ConfigError, CourtsideConfig};
use std::io::Write;
use std::time::Duration;

#[test]
fn defaults_match_the_hosted_service() {
    let config = CourtsideConfig::default();
    config.validate().expect("defaults validate");

    assert_eq!(
        config.service.base_url,
        "https://the-bench-prophet.onrender.com"
    );
    assert_eq!(config.service.ready_token, "operational");
    assert_eq!(config.service.request_timeout, Duration::from_secs(30));

    assert_eq!(config.probe.max_attempts, 8);
    assert_eq!(config.probe.base_delay, Duration::from_secs(1));
    assert_eq!(config.probe.max_delay, Duration::from_secs(30));
    assert_eq!(config.probe.multiplier, 2.0);
    assert_eq!(config.probe.jitter, JitterMode::None);
    assert_eq!(config.probe.keep_alive, Duration::from_secs(240));

    assert_eq!(config.request.max_attempts, 3);
    assert_eq!(config.request.base_delay, Duration::from_secs(2));
    assert_eq!(config.request.attempt_timeout, Duration::from_secs(10));
    assert!(config.auth.bearer_token.is_none());
}

#[test]
fn partial_yaml_keeps_remaining_defaults() {
    let config = CourtsideConfig::from_yaml_str(
        r#"
service:
  base_url: http://localhost:5000
probe:
  max_attempts: 4
  base_delay: 250ms
  keep_alive: 5m
  jitter: full
"#,
    )
    .expect("partial config loads");

    assert_eq!(config.service.base_url, "http://localhost:5000");
    assert_eq!(config.service.ready_token, "operational");
    assert_eq!(config.probe.max_attempts, 4);
    assert_eq!(config.probe.base_delay, Duration::from_millis(250));
    assert_eq!(config.probe.keep_alive, Duration::from_secs(300));
    assert_eq!(config.probe.jitter, JitterMode::Full);
    assert_eq!(config.probe.max_delay, Duration::from_secs(30));
    assert_eq!(config.request.max_attempts, 3);
}

#[test]
fn auth_token_is_optional_but_read() {
    let config = CourtsideConfig::from_yaml_str(
        r#"
auth:
  bearer_token: abc123
"#,
    )
    .expect("auth config loads");
    assert_eq!(config.auth.bearer_token.as_deref(), Some("abc123"));
}

#[test]
fn multiplier_at_or_below_one_is_rejected() {
    let err = CourtsideConfig::from_yaml_str(
        r#"
probe:
  multiplier: 1.0
"#,
    )
    .expect_err("multiplier 1.0 must be rejected");
    assert_invalid_field(err, "probe.multiplier");
}

#[test]
fn malformed_base_url_is_rejected() {
    let err = CourtsideConfig::from_yaml_str(
        r#"
service:
  base_url: "not a url"
"#,
    )
    .expect_err("malformed URL must be rejected");
    assert_invalid_field(err, "service.base_url");
}

#[test]
fn max_delay_below_base_delay_is_rejected() {
    let err = CourtsideConfig::from_yaml_str(
        r#"
probe:
  base_delay: 10s
  max_delay: 1s
"#,
    )
    .expect_err("max_delay below base_delay must be rejected");
    assert_invalid_field(err, "probe.max_delay");
}

#[test]
fn zero_request_attempts_are_rejected() {
    let err = CourtsideConfig::from_yaml_str(
        r#"
request:
  max_attempts: 0
"#,
    )
    .expect_err("zero attempts must be rejected");
    assert_invalid_field(err, "request.max_attempts");
}

#[test]
fn unparsable_duration_is_a_load_error() {
    let result = CourtsideConfig::from_yaml_str(
        r#"
probe:
  base_delay: quickly
"#,
    );
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn load_reads_an_explicit_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("courtside.yaml");
    let mut file = std::fs::File::create(&path).expect("create config file");
    writeln!(file, "service:").expect("write config");
    writeln!(file, "  base_url: http://localhost:9999").expect("write config");

    let config = CourtsideConfig::load(path.to_str()).expect("explicit config loads");
    assert_eq!(config.service.base_url, "http://localhost:9999");
}

#[test]
fn load_fails_for_a_missing_explicit_file() {
    let result = CourtsideConfig::load(Some("does/not/exist.yaml"));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

fn assert_invalid_field(err: ConfigError, expected: &str) {
    match err {
        ConfigError::Invalid { field, .. } => assert_eq!(field, expected),
        other => panic!("expected Invalid {{ field: {expected} }}, got {other}"),
    }
}
