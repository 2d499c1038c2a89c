use super::{check_executable, sampling_env, ConfigErrors, HarnessConfig};
use std::{collections::BTreeMap, fs, os::unix::fs::PermissionsExt, time::Duration};

#[test]
pub fn sampling_env_matches_the_worker_contract() {
    let env: BTreeMap<String, String> = sampling_env(500).into_iter().collect();

    assert_eq!(env["CALC_PCT_PARAM"], "0 -1 500 0");
    assert_eq!(env["CALC_BPOS_SAMPLE"], "500 0");
    assert_eq!(env["CALC_POS_SAMPLE"], "500 0");
    assert_eq!(env["CALC_RPOS_SAMPLE"], "500 0");
    assert_eq!(env["CALC_RAPOS_SAMPLE"], "500 0");
}

#[test]
pub fn config_parses_and_builds_the_command_line() {
    let config: HarnessConfig = serde_yaml::from_str(
        "worker:\n  exec: build/Calc\n  params: [\"progress-report=0\"]\npoll_interval_ms: 250\n",
    )
    .unwrap();

    assert_eq!(config.command(), ["build/Calc", "progress-report=0"]);
    assert_eq!(config.poll_interval(), Duration::from_millis(250));
}

#[test]
pub fn unknown_config_keys_are_rejected() {
    let result =
        serde_yaml::from_str::<HarnessConfig>("worker:\n  exec: build/Calc\nworkers: 4\n");

    assert!(result.is_err());
}

#[test]
pub fn env_table_overrides_sampling_variables() {
    let mut config = HarnessConfig::default();
    config
        .env
        .insert("CALC_PCT_PARAM".to_owned(), "custom".to_owned());
    config
        .env
        .insert("CALC_SEED".to_owned(), "42".to_owned());

    let environment: BTreeMap<String, String> =
        config.environment(Some(100)).into_iter().collect();

    assert_eq!(environment["CALC_PCT_PARAM"], "custom");
    assert_eq!(environment["CALC_SEED"], "42");
    assert_eq!(environment["CALC_POS_SAMPLE"], "100 0");
}

#[test]
pub fn no_sample_leaves_only_the_env_table() {
    let mut config = HarnessConfig::default();
    config
        .env
        .insert("CALC_SEED".to_owned(), "42".to_owned());

    assert_eq!(
        config.environment(None),
        [("CALC_SEED".to_owned(), "42".to_owned())]
    );
}

#[test]
pub fn load_reports_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let result = HarnessConfig::load(&dir.path().join("harness.yml"));
    assert!(matches!(result, Err(ConfigErrors::ReadConfig { .. })));
}

#[test]
pub fn check_executable_follows_the_mode_bits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker");
    fs::write(&path, "#!/bin/sh\n").unwrap();

    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(!check_executable(&path).unwrap());

    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    assert!(check_executable(&path).unwrap());

    assert!(matches!(
        check_executable(&dir.path().join("absent")),
        Err(ConfigErrors::FileNotFound)
    ));
}
