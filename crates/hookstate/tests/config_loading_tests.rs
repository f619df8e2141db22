//! Table-driven tests for provider config and manifest loading.

mod common;

use std::path::Path;

use secrecy::ExposeSecret;
use serial_test::serial;

use hookstate::config::load_config_from_str;
use hookstate::manifest::{parse_manifests, validate_manifests};

struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    expected_error: Option<&'static str>,
}

const PROVIDER_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{ "apiKey": "sk_test_123" }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "apiKey": "sk_test_123",
            "apiBase": "http://localhost:12111",
            "stripeVersion": "2020-08-27",
            "connectTimeoutSecs": 3,
            "requestTimeoutSecs": 15
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: r#"{ "apiKey": "#,
        should_succeed: false,
        expected_error: Some("parse config JSON"),
    },
    ConfigTestCase {
        name: "empty_api_base",
        config_json: r#"{ "apiKey": "k", "apiBase": "" }"#,
        should_succeed: false,
        expected_error: Some("apiBase must not be empty"),
    },
    ConfigTestCase {
        name: "zero_request_timeout",
        config_json: r#"{ "apiKey": "k", "requestTimeoutSecs": 0 }"#,
        should_succeed: false,
        expected_error: Some("timeouts must be greater than 0"),
    },
    ConfigTestCase {
        name: "missing_key_file",
        config_json: r#"{ "apiKeyFile": "/nonexistent/hookstate/key" }"#,
        should_succeed: false,
        expected_error: Some("resolve API key"),
    },
];

#[test]
fn test_provider_config_loading() {
    for test_case in PROVIDER_CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}': Expected success but got error: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Test '{}': Expected error but got success",
                test_case.name
            );

            if let Some(expected_error) = test_case.expected_error {
                let error_msg = result.err().unwrap().to_string();
                assert!(
                    error_msg.contains(expected_error),
                    "Test '{}': Expected error containing '{}', got '{}'",
                    test_case.name,
                    expected_error,
                    error_msg
                );
            }
        }
    }
}

#[test]
#[serial]
fn test_api_key_from_named_env_var() {
    std::env::set_var("HOOKSTATE_TEST_API_KEY", "sk_test_env");
    let config = load_config_from_str(r#"{ "apiKeyEnvVar": "HOOKSTATE_TEST_API_KEY" }"#).unwrap();
    std::env::remove_var("HOOKSTATE_TEST_API_KEY");

    assert_eq!(config.api_key.expose_secret(), "sk_test_env");
}

#[test]
fn test_api_key_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let key_path = dir.path().join("stripe.key");
    std::fs::write(&key_path, "sk_test_file\n").unwrap();

    let json = format!(r#"{{ "apiKeyFile": "{}" }}"#, key_path.display());
    let config = load_config_from_str(&json).unwrap();

    assert_eq!(config.api_key.expose_secret(), "sk_test_file");
}

struct ManifestTestCase {
    name: &'static str,
    yaml: &'static str,
    should_succeed: bool,
    expected_error: Option<&'static str>,
}

const MANIFEST_TESTS: &[ManifestTestCase] = &[
    ManifestTestCase {
        name: "valid_minimal",
        yaml: r#"
apiVersion: hookstate.io/v1
kind: WebhookEndpoint
metadata:
  name: billing
spec:
  url: https://example.com/hook
  enabled_events: ["*"]
"#,
        should_succeed: true,
        expected_error: None,
    },
    ManifestTestCase {
        name: "valid_all_fields",
        yaml: r#"
apiVersion: hookstate.io/v1
kind: WebhookEndpoint
metadata:
  name: billing
  labels:
    env: prod
spec:
  url: https://example.com/hook
  enabled_events: ["invoice.paid"]
  description: Billing events
  disabled: false
  metadata:
    team: billing
"#,
        should_succeed: true,
        expected_error: None,
    },
    ManifestTestCase {
        name: "missing_url",
        yaml: r#"
apiVersion: hookstate.io/v1
kind: WebhookEndpoint
metadata:
  name: billing
spec:
  enabled_events: ["*"]
"#,
        should_succeed: false,
        expected_error: Some("Missing required attribute 'url'"),
    },
    ManifestTestCase {
        name: "secret_is_computed",
        yaml: r#"
apiVersion: hookstate.io/v1
kind: WebhookEndpoint
metadata:
  name: billing
spec:
  url: https://example.com/hook
  enabled_events: ["*"]
  secret: whsec_123
"#,
        should_succeed: false,
        expected_error: Some("'secret' is computed"),
    },
    ManifestTestCase {
        name: "events_not_a_list",
        yaml: r#"
apiVersion: hookstate.io/v1
kind: WebhookEndpoint
metadata:
  name: billing
spec:
  url: https://example.com/hook
  enabled_events: charge.succeeded
"#,
        should_succeed: false,
        expected_error: Some("'enabled_events' expects list(string)"),
    },
    ManifestTestCase {
        name: "wrong_api_version",
        yaml: r#"
apiVersion: hookstate.io/v2
kind: WebhookEndpoint
metadata:
  name: billing
spec: {}
"#,
        should_succeed: false,
        expected_error: Some("Invalid API version"),
    },
    ManifestTestCase {
        name: "empty_name",
        yaml: r#"
apiVersion: hookstate.io/v1
kind: WebhookEndpoint
metadata:
  name: ""
spec:
  url: https://example.com/hook
  enabled_events: ["*"]
"#,
        should_succeed: false,
        expected_error: Some("metadata.name is required"),
    },
];

#[test]
fn test_manifest_loading() {
    for test_case in MANIFEST_TESTS {
        let result = parse_manifests(test_case.yaml, Path::new("test.yaml"))
            .and_then(|manifests| validate_manifests(&manifests).map(|_| manifests));

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}': Expected success but got error: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Test '{}': Expected error but got success",
                test_case.name
            );

            if let Some(expected_error) = test_case.expected_error {
                let error_msg = result.err().unwrap().to_string();
                assert!(
                    error_msg.contains(expected_error),
                    "Test '{}': Expected error containing '{}', got '{}'",
                    test_case.name,
                    expected_error,
                    error_msg
                );
            }
        }
    }
}
