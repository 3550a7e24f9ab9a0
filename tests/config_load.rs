// tests/config_load.rs
use projection_sync::config::AppConfig;
use std::path::PathBuf;
use std::{env, fs};

#[test]
fn partial_file_keeps_defaults_for_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("sync.toml");
    fs::write(
        &p,
        r#"
[feed]
max_attempts = 5

[sink.pacing]
batch_pause_ms = 0
"#,
    )
    .unwrap();

    let cfg = AppConfig::load_from(&p).unwrap();
    assert_eq!(cfg.feed.max_attempts, 5);
    assert_eq!(cfg.feed.timeout_ms, 10_000);
    assert_eq!(cfg.sink.batch_size, 500);
    assert_eq!(cfg.sink.pacing.batch_pause_ms, 0);
    assert_eq!(cfg.sink.pacing.step_pause_ms, 1_000);
    assert_eq!(cfg.interval().as_secs(), 3600);
}

#[test]
fn broken_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("sync.toml");
    fs::write(&p, "[feed\nurl = ").unwrap();
    let err = AppConfig::load_from(&p).unwrap_err();
    assert!(format!("{err:#}").contains("parsing config"));
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var("PROJECTION_SYNC_CONFIG");
    env::remove_var("GOOGLE_SHEETS_ID");
    env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");

    // 1) Nothing on disk -> built-in defaults
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.feed.override_path, PathBuf::from("data.json"));
    assert!(cfg.sink.spreadsheet_id.is_empty());

    // 2) Fallback file in ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/projection_sync.toml"),
        "[schedule]\ninterval_secs = 60\n[sink]\nspreadsheet_id = \"from-file\"\n",
    )
    .unwrap();
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.schedule.interval_secs, 60);
    assert_eq!(cfg.sink.spreadsheet_id, "from-file");

    // 3) Env path wins; GOOGLE_SHEETS_ID and GOOGLE_APPLICATION_CREDENTIALS override the file
    let p_env = tmp.path().join("other.toml");
    fs::write(
        &p_env,
        "[schedule]\ninterval_secs = 120\n[sink]\ncredentials_path = \"file-creds.json\"\n",
    )
    .unwrap();
    env::set_var("PROJECTION_SYNC_CONFIG", p_env.display().to_string());
    env::set_var("GOOGLE_SHEETS_ID", "from-env");
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.schedule.interval_secs, 120);
    assert_eq!(cfg.sink.spreadsheet_id, "from-env");
    assert_eq!(cfg.sink.credentials_path, PathBuf::from("file-creds.json"));

    env::set_var("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/sa.json");
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.sink.credentials_path, PathBuf::from("/secrets/sa.json"));
    env::remove_var("GOOGLE_APPLICATION_CREDENTIALS");

    // 4) Env path pointing nowhere is an error
    env::set_var("PROJECTION_SYNC_CONFIG", tmp.path().join("missing.toml"));
    assert!(AppConfig::load_default().is_err());

    env::remove_var("PROJECTION_SYNC_CONFIG");
    env::remove_var("GOOGLE_SHEETS_ID");
    env::set_current_dir(&old).unwrap();
}
