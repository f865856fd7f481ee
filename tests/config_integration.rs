//! Integration tests for template configuration.
//!
//! These tests verify that configuration is read from TOML and the
//! environment, validated, and honored during resolution.

use sqlweave::scripting::{DynamicTemplate, SqlNode};
use sqlweave::{ErrorCode, MapEnvSource, MarkerStyle, TemplateConfig, Value};

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config: TemplateConfig = toml::from_str("").expect("Failed to parse config");
    assert_eq!(config, TemplateConfig::default());
    assert_eq!(config.placeholder_open, "{{");
    assert_eq!(config.inline_open, "${");
    assert_eq!(config.iteration_prefix, "__frch_");
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r##"
        placeholder_open = "#{"
        placeholder_close = "}"
        inline_open = "${"
        inline_close = "}"
        marker_style = "dollar"
        iteration_prefix = "__it_"
        database_id = "postgres"
    "##;

    let config: TemplateConfig = toml::from_str(config_str).expect("Failed to parse config");
    config.validate().expect("valid config");

    assert_eq!(config.placeholder_open, "#{");
    assert_eq!(config.marker_style, MarkerStyle::Dollar);
    assert_eq!(config.iteration_prefix, "__it_");
    assert_eq!(config.database_id.as_deref(), Some("postgres"));
}

#[test]
fn test_config_invalid_marker_style() {
    let result: Result<TemplateConfig, _> = toml::from_str(r#"marker_style = "colon""#);
    assert!(result.is_err());
}

#[test]
fn test_config_validation() {
    let config = TemplateConfig::default().with_placeholder("${", "}");
    let err = config.validate().unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(err.is_configuration_error());

    let config = TemplateConfig::default().with_placeholder("", "}}");
    assert!(config.validate().is_err());
}

#[test]
fn test_config_from_env() {
    let env = MapEnvSource::new()
        .set("SQLWEAVE_MARKER_STYLE", "dollar")
        .set("SQLWEAVE_PLACEHOLDER_OPEN", "#{")
        .set("SQLWEAVE_PLACEHOLDER_CLOSE", "}")
        .set("SQLWEAVE_DATABASE_ID", "mysql");

    let config = TemplateConfig::from_source(&env).unwrap();
    assert_eq!(config.marker_style, MarkerStyle::Dollar);
    assert_eq!(config.placeholder_open, "#{");
    assert_eq!(config.database_id.as_deref(), Some("mysql"));

    let env = MapEnvSource::new().set("SQLWEAVE_MARKER_STYLE", "colon");
    let err = TemplateConfig::from_source(&env).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
}

/// Custom delimiters are used by both resolution stages.
#[test]
fn test_custom_delimiters_resolve() {
    let config: TemplateConfig = toml::from_str(
        r##"
        placeholder_open = "#{"
        placeholder_close = "}"
        marker_style = "dollar"
    "##,
    )
    .unwrap();

    let root = SqlNode::parse_text("SELECT * FROM ${table} WHERE id = #{id}", &config).unwrap();
    let template = DynamicTemplate::with_config(root, config).unwrap();

    let param: Value = serde_json::json!({"table": "users", "id": 3}).into();
    let query = template.resolve(&param).unwrap();
    assert_eq!(query.text(), "SELECT * FROM users WHERE id = $1");
    assert_eq!(query.values(), vec![Value::Int(3)]);
}

/// Round-trip configuration through TOML
#[test]
fn test_config_toml_round_trip() {
    let config = TemplateConfig::default()
        .with_marker_style(MarkerStyle::Dollar)
        .with_database_id("sqlite");

    let encoded = toml::to_string(&config).unwrap();
    let decoded: TemplateConfig = toml::from_str(&encoded).unwrap();
    assert_eq!(decoded, config);
}
