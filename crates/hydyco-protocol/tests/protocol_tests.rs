//! Protocol layer tests — config parsing, lifecycle errors, error bodies.

use std::io::Write;

use hydyco_protocol::*;
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────
// ServerConfig
// ─────────────────────────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 3000);
    assert!(config.logger);
    assert_eq!(config.auth.secret_or_key, "yourKey");
    assert!(config.cors.is_empty());
}

#[test]
fn config_camel_case_keys() {
    let config: ServerConfig = serde_json::from_value(json!({
        "port": 8080,
        "logger": false,
        "auth": { "secretOrKey": "s3cret" },
        "cors": { "origin": "https://example.com", "credentials": true },
    }))
    .unwrap();

    assert_eq!(config.port, 8080);
    assert!(!config.logger);
    assert_eq!(config.auth.secret_or_key, "s3cret");
    assert_eq!(config.cors["origin"], "https://example.com");
    assert_eq!(config.cors["credentials"], true);
}

#[test]
fn config_missing_keys_use_defaults() {
    let config: ServerConfig = serde_json::from_value(json!({ "port": 4000 })).unwrap();
    assert_eq!(config.port, 4000);
    assert!(config.logger);
    assert_eq!(config.auth.secret_or_key, "yourKey");
}

#[test]
fn config_builders() {
    let mut cors = CorsOptions::new();
    cors.insert("maxAge".into(), json!(60));

    let config = ServerConfig::default()
        .with_port(0)
        .with_logger(false)
        .with_secret("abc")
        .with_cors(cors);

    assert_eq!(config.port, 0);
    assert!(!config.logger);
    assert_eq!(config.auth.secret_or_key, "abc");
    assert_eq!(config.cors["maxAge"], 60);
}

#[test]
fn config_debug_redacts_secret() {
    let config = ServerConfig::default().with_secret("do-not-print");
    let debug = format!("{config:?}");
    assert!(!debug.contains("do-not-print"));
    assert!(debug.contains("[redacted]"));
}

#[test]
fn config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "port": 5050, "auth": {{ "secretOrKey": "k" }} }}"#).unwrap();

    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.port, 5050);
    assert_eq!(config.auth.secret_or_key, "k");
}

#[test]
fn config_from_missing_file() {
    let err = ServerConfig::from_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn config_from_invalid_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    let err = ServerConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn admin_paths() {
    assert_eq!(ADMIN_PREFIX, "/admin");
    assert_eq!(ADMIN_UI_PATH, "/admin-ui");
}

// ─────────────────────────────────────────────────────────────────────
// Lifecycle errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn register_after_start_messages() {
    assert_eq!(
        LifecycleError::RegisterAfterStart(Registration::Plugins).to_string(),
        "Server is running, cannot register plugin after server is started"
    );
    assert_eq!(
        LifecycleError::RegisterAfterStart(Registration::Middleware).to_string(),
        "Server is running, cannot register middleware after server is started"
    );
    assert_eq!(
        LifecycleError::RegisterAfterStart(Registration::Routes).to_string(),
        "Server is running, cannot register routes after server is started"
    );
}

#[test]
fn precondition_message() {
    assert_eq!(
        PreconditionError::DatabaseNotRegistered.to_string(),
        "database must be registered before start"
    );
}

// ─────────────────────────────────────────────────────────────────────
// ErrorBody
// ─────────────────────────────────────────────────────────────────────

#[test]
fn error_body_serialization() {
    let body = ErrorBody::not_found("Model name user not found");
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value, json!({ "error": "Model name user not found", "code": "not_found" }));
}

#[test]
fn error_codes_map_to_status() {
    assert_eq!(ErrorBody::bad_request("x").status(), 400);
    assert_eq!(ErrorBody::unauthorized("x").status(), 401);
    assert_eq!(ErrorBody::not_found("x").status(), 404);
    assert_eq!(ErrorBody::new(ErrorCode::PayloadTooLarge, "x").status(), 413);
    assert_eq!(ErrorBody::internal("x").status(), 500);
}

#[test]
fn error_body_display() {
    assert_eq!(ErrorBody::internal("boom").to_string(), "[500] boom");
}
