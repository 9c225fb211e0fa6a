use super::*;
use crate::paths::HarnessPaths;

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents.as_bytes()).expect("write file");
}

#[test]
fn partial_config_fills_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("harness.json");
    write_file(&path, r#"{"model": "claude-opus-x", "runs": 5}"#);

    let config = load_config(&path).expect("load config");
    assert_eq!(config.model, "claude-opus-x");
    assert_eq!(config.runs, 5);
    assert_eq!(config.judge_model, DEFAULT_JUDGE_MODEL);
    assert_eq!(config.bench.num_runs, 10);
    assert_eq!(config.bench.pass_criteria.len(), 2);
    validate_config(&config).expect("valid config");
}

#[test]
fn command_backend_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("harness.json");
    let config = HarnessConfig {
        backend: BackendConfig::Command {
            command: "llm -m local".to_string(),
        },
        ..HarnessConfig::default()
    };
    let text = serde_json::to_string_pretty(&config).expect("serialize config");
    write_file(&path, &text);
    let text = fs::read_to_string(&path).expect("read config");
    assert!(text.contains(r#""kind": "command""#), "{text}");
    assert_eq!(load_config(&path).expect("reload"), config);
}

#[test]
fn env_overrides_backend_and_tool() {
    let mut config = HarnessConfig::default();
    apply_env_overrides(&mut config, |key| match key {
        LM_COMMAND_ENV => Some("cat".to_string()),
        TOOL_BIN_ENV => Some("/opt/telos".to_string()),
        _ => None,
    });
    assert_eq!(
        config.backend,
        BackendConfig::Command {
            command: "cat".to_string()
        }
    );
    assert_eq!(config.tool_bin, "/opt/telos");
}

#[test]
fn blank_env_values_are_ignored() {
    let mut config = HarnessConfig::default();
    apply_env_overrides(&mut config, |_| Some("  ".to_string()));
    assert_eq!(config, HarnessConfig::default());
}

#[test]
fn validation_rejects_bad_values() {
    let cases = [
        HarnessConfig {
            schema_version: 2,
            ..HarnessConfig::default()
        },
        HarnessConfig {
            runs: 0,
            ..HarnessConfig::default()
        },
        HarnessConfig {
            model: " ".to_string(),
            ..HarnessConfig::default()
        },
        HarnessConfig {
            tool_timeout_secs: 0,
            ..HarnessConfig::default()
        },
        HarnessConfig {
            backend: BackendConfig::Command {
                command: String::new(),
            },
            ..HarnessConfig::default()
        },
    ];
    for config in cases {
        assert!(validate_config(&config).is_err(), "{config:?}");
    }

    let mut duplicated = HarnessConfig::default();
    duplicated.bench.pass_criteria.push(PassCriterion {
        intent_count: 1000,
        threshold_ms: 100.0,
    });
    let err = validate_config(&duplicated).unwrap_err();
    assert!(err.to_string().contains("duplicate"), "{err}");
}

#[test]
fn root_config_wins_over_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = HarnessPaths::new(dir.path().to_path_buf());
    write_file(&paths.config_path(), r#"{"runs": 7}"#);
    let config = resolve_config(None, &paths).expect("resolve config");
    assert_eq!(config.runs, 7);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = HarnessPaths::new(dir.path().to_path_buf());
    let missing = dir.path().join("nope.json");
    assert!(resolve_config(Some(&missing), &paths).is_err());
}
