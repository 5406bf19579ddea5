use super::*;

fn minimal_json() -> &'static str {
    r#"{
        "schema_version": 1,
        "bot": { "title": "Spirited Away" },
        "facebook": { "access_token": "token" }
    }"#
}

#[test]
fn minimal_config_fills_defaults() {
    let config: BotConfig = serde_json::from_str(minimal_json()).expect("parse");
    assert_eq!(config.bot.name, "Bot");
    assert_eq!(config.bot.frames_directory, PathBuf::from("frames"));
    assert_eq!(config.bot.frames_ext, "jpg");
    assert_eq!(config.bot.frames_naming, "$N$");
    assert_eq!(config.bot.upload_interval(), Duration::from_secs(150));
    assert!(!config.bot.delete_files);
    assert_eq!(config.facebook.api_version, "v16.0");
    assert_eq!(
        config.facebook.retry_policy(),
        RetryPolicy {
            max_retries: 5,
            backoff: Duration::from_secs(60),
            throttle_multiplier: 10,
        }
    );
    assert!(config.best_of_enabled().is_none());
    assert!(config.alternate_frames_enabled().is_none());
    validate_config(&config).expect("minimal config is valid");
}

#[test]
fn best_of_defaults_and_durations() {
    let raw = r#"{
        "schema_version": 1,
        "bot": { "title": "t" },
        "best_of": { "album_id": "123" }
    }"#;
    let config: BotConfig = serde_json::from_str(raw).expect("parse");
    let best_of = config.best_of_enabled().expect("enabled by default");
    assert_eq!(best_of.reactions_threshold, 50);
    assert_eq!(best_of.cooldown(), Duration::from_secs(24 * 3600));
    assert_eq!(best_of.poll_interval(), Duration::from_secs(3600));
    assert!(best_of.store_best_ofs);
}

#[test]
fn unknown_fields_are_rejected() {
    let raw = r#"{
        "schema_version": 1,
        "bot": { "title": "t", "upload_intervall": 10 }
    }"#;
    assert!(serde_json::from_str::<BotConfig>(raw).is_err());
}

#[test]
fn validate_rejects_unusable_settings() {
    let mut config = default_config();
    validate_config(&config).expect("default config is valid");

    config.bot.frames_naming = "frame_".to_string();
    let err = validate_config(&config).expect_err("missing placeholder");
    assert!(format!("{err:#}").contains("$N$"));

    let mut config = default_config();
    config.bot.frames_ext = ".png".to_string();
    assert!(validate_config(&config).is_err());

    let mut config = default_config();
    if let Some(best_of) = config.best_of.as_mut() {
        best_of.enabled = true;
    }
    let err = validate_config(&config).expect_err("album id required");
    assert!(err.to_string().contains("album_id"));

    let mut config = default_config();
    config.schema_version = 99;
    assert!(validate_config(&config).is_err());
}

#[test]
fn validate_rejects_best_of_durations_out_of_range() {
    let raw = r#"{
        "schema_version": 1,
        "bot": { "title": "t" },
        "best_of": { "album_id": "123", "wait_hours": 10000000000000000 }
    }"#;
    let config: BotConfig = serde_json::from_str(raw).expect("parse");
    let err = validate_config(&config).expect_err("cooldown too long");
    assert!(err.to_string().contains("best_of.wait_hours"));
    let best_of = config.best_of_enabled().expect("enabled");
    assert_eq!(best_of.cooldown(), Duration::from_secs(u64::MAX));

    let mut config = config;
    if let Some(best_of) = config.best_of.as_mut() {
        best_of.wait_hours = 24;
        best_of.poll_interval_minutes = u64::MAX;
    }
    let err = validate_config(&config).expect_err("poll interval too long");
    assert!(err.to_string().contains("best_of.poll_interval_minutes"));
    let best_of = config.best_of_enabled().expect("enabled");
    assert_eq!(best_of.poll_interval(), Duration::from_secs(u64::MAX));
}

#[test]
fn env_token_overrides_config_token() {
    let mut config = default_config();
    config.facebook.access_token = "from-file".to_string();
    assert_eq!(
        resolve_access_token_from(&config, Some(" from-env ".to_string())).expect("token"),
        "from-env"
    );
    assert_eq!(
        resolve_access_token_from(&config, Some(String::new())).expect("token"),
        "from-file"
    );
    config.facebook.access_token = "  ".to_string();
    assert!(resolve_access_token_from(&config, None).is_err());
}

#[test]
fn write_then_load_preserves_config() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let paths = WorkingPaths::new(dir.path().to_path_buf());
    let config = default_config();
    write_config(&paths, &config).expect("write");
    assert_eq!(load_config(&paths).expect("load"), config);
}

#[test]
fn relative_frames_directory_resolves_against_root() {
    let paths = WorkingPaths::new(PathBuf::from("/srv/bot"));
    let mut config = default_config();
    assert_eq!(config.bot.frames_dir(&paths), PathBuf::from("/srv/bot/frames"));
    config.bot.frames_directory = PathBuf::from("/data/frames");
    assert_eq!(config.bot.frames_dir(&paths), PathBuf::from("/data/frames"));
}
