use std::ffi::OsString;
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use sprig_config::{
    discover_config_path, load_for_workspace, with_config_env_lock, SprigConfig,
    SPRIG_CONFIG_ENV_VAR,
};
use tempfile::tempdir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        with_config_env_lock(|| std::env::set_var(key, value));
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        with_config_env_lock(|| std::env::remove_var(key));
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        with_config_env_lock(|| match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        });
    }
}

#[test]
fn discovers_sprig_toml_in_workspace_root() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(SPRIG_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("sprig.toml");
    std::fs::write(&config_path, "[logging]\njson = true\n").unwrap();

    let discovered = discover_config_path(dir.path()).expect("sprig.toml should be discovered");
    assert_eq!(discovered, config_path.canonicalize().unwrap_or(config_path));
}

#[test]
fn prefers_sprig_toml_over_hidden_variant() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(SPRIG_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(".sprig.toml"), "").unwrap();
    assert_eq!(
        discover_config_path(dir.path()).and_then(|p| p.file_name().map(|n| n.to_owned())),
        Some(OsString::from(".sprig.toml"))
    );

    std::fs::write(dir.path().join("sprig.toml"), "").unwrap();
    assert_eq!(
        discover_config_path(dir.path()).and_then(|p| p.file_name().map(|n| n.to_owned())),
        Some(OsString::from("sprig.toml"))
    );
}

#[test]
fn env_var_overrides_discovery_relative_to_root() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("sprig.toml"), "").unwrap();
    std::fs::create_dir_all(dir.path().join("conf")).unwrap();
    let custom = dir.path().join("conf/custom.toml");
    std::fs::write(&custom, "[annotations]\nmatch_simple_names = true\n").unwrap();

    let _env = EnvVarGuard::set(SPRIG_CONFIG_ENV_VAR, std::path::Path::new("conf/custom.toml"));

    let (config, path, diagnostics) = load_for_workspace(dir.path()).expect("load");
    assert_eq!(path, Some(custom.canonicalize().unwrap_or(custom)));
    assert!(config.annotations.match_simple_names);
    assert!(diagnostics.is_empty());
}

#[test]
fn missing_config_yields_defaults() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(SPRIG_CONFIG_ENV_VAR);

    let dir = tempdir().unwrap();
    let (config, path, diagnostics) = load_for_workspace(dir.path()).expect("load");
    assert_eq!(config, SprigConfig::default());
    assert_eq!(path, None);
    assert!(diagnostics.is_empty());
}

#[test]
fn unreadable_config_path_is_an_io_error() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let dir = tempdir().unwrap();
    let _env = EnvVarGuard::set(SPRIG_CONFIG_ENV_VAR, &dir.path().join("missing.toml"));

    let err = load_for_workspace(dir.path()).expect_err("missing file");
    assert!(err.to_string().starts_with("failed to read config file"), "{err}");
}
