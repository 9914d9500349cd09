use sfd_config::{
    load_layered_yaml_from_strings, report_unused_keys, ConfigConsumer, UnusedKeyPolicy,
};

/// Validates:
/// 1) Unused keys are detected in WARN mode but do not error.
/// 2) Unused keys cause failure in FAIL mode.
/// 3) Keys under consumed prefixes are not flagged.
/// 4) Deterministic ordering of unused pointers.

const YAML: &str = r#"
workflow:
  transitions:
    pending: [confirmed]
daemon:
  bind_addr: "127.0.0.1:8898"
  colour: blue
invoicing:
  prefix: INV
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(
        ConfigConsumer::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )
    .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/daemon/colour".to_string(), "/invoicing/prefix".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(ConfigConsumer::Cli, &loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "got: {msg}");
    assert!(msg.contains("consumer=CLI"));
}

#[test]
fn cli_does_not_consume_daemon_section() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report =
        report_unused_keys(ConfigConsumer::Cli, &loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert!(report
        .unused_leaf_pointers
        .contains(&"/daemon/bind_addr".to_string()));
    assert!(!report
        .unused_leaf_pointers
        .iter()
        .any(|p| p.starts_with("/workflow")));
}

#[test]
fn consumed_only_config_is_clean() {
    let yaml = r#"
tenants:
  acme:
    workflow:
      transitions:
        pending: [confirmed]
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigConsumer::Cli, &loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
