use std::io::Write;

use serial_test::serial;

use crate::domain::RequestPolicy;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.cache, CacheConfig::default());
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
}

#[test]
fn empty_typename_field_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.typename_field = "  ".to_string();

    let err = Settings::from_raw(raw).expect_err("empty field must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.typename_field",
            ..
        }
    ));
}

#[test]
fn typename_field_is_trimmed() {
    let mut raw = RawSettings::default();
    raw.cache.typename_field = " kind ".to_string();

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.typename_field, "kind");
}

#[test]
fn unparsable_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level must fail");
    assert!(err.to_string().contains("logging.level"));
}

#[test]
fn json_logging_selects_json_format() {
    let mut raw = RawSettings::default();
    raw.logging.json = Some(true);
    raw.logging.level = Some("debug".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
#[serial]
fn explicit_file_is_layered() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp config file");
    file.write_all(
        b"[cache]\nreexecute_policy = \"cache-first\"\nindex_type_conditions = false\n\n[logging]\nlevel = \"warn\"\n",
    )
    .expect("write config file");

    let settings = load(Some(file.path())).expect("load settings");

    assert_eq!(settings.cache.reexecute_policy, RequestPolicy::CacheFirst);
    assert!(!settings.cache.index_type_conditions);
    assert!(settings.cache.enabled);
    assert_eq!(settings.logging.level, LevelFilter::WARN);
}

#[test]
fn missing_explicit_file_fails() {
    let path = Path::new("/nonexistent/gqlcache-missing.toml");
    assert!(matches!(load(Some(path)), Err(LoadError::Build(_))));
}

#[test]
#[serial]
fn environment_overrides_files() {
    // SAFETY: serialised with every other test that reads the environment.
    unsafe { std::env::set_var("GQLCACHE__CACHE__ENABLED", "false") };
    let settings = load(None);
    unsafe { std::env::remove_var("GQLCACHE__CACHE__ENABLED") };

    let settings = settings.expect("load settings");
    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.typename_field, "__typename");
}
