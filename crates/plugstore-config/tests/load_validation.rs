//! Config load validation tests for plugstore-config.
// crates/plugstore-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards, defaults, and section limits.
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use plugstore_config::ConfigError;
use plugstore_config::LogFormat;
use plugstore_config::PlugstoreConfig;
use plugstore_config::config_toml_example;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<PlugstoreConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(PlugstoreConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(PlugstoreConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(PlugstoreConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(PlugstoreConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_rejects_unknown_keys() -> TestResult {
    let file = write_config("[bus]\nnamespace = \"db\"\nsurprise = true\n")?;
    assert_invalid(PlugstoreConfig::load(Some(file.path())), "config parse error")?;
    Ok(())
}

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let file = write_config("")?;
    let config = PlugstoreConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config != PlugstoreConfig::default() {
        return Err("empty config should equal defaults".to_string());
    }
    if config.bus.namespace != "db" || config.search.max_rows != 1_000 || config.gateway.enabled {
        return Err("unexpected default values".to_string());
    }
    Ok(())
}

#[test]
fn example_config_loads_and_validates() -> TestResult {
    let config = PlugstoreConfig::from_toml(&config_toml_example()).map_err(|err| err.to_string())?;
    if config.logging.format != LogFormat::Pretty {
        return Err("example should use pretty logs".to_string());
    }
    if config.store.sqlite_config().path != Path::new("data/plugstore.db") {
        return Err("example store path mismatch".to_string());
    }
    Ok(())
}

#[test]
fn section_limits_are_enforced() -> TestResult {
    assert_invalid(PlugstoreConfig::from_toml("[bus]\nnamespace = \"a.b\"\n"), "bus.namespace")?;
    assert_invalid(PlugstoreConfig::from_toml("[bus]\nchannel_capacity = 0\n"), "bus.channel_capacity")?;
    assert_invalid(PlugstoreConfig::from_toml("[search]\nmax_rows = 0\n"), "search.max_rows")?;
    assert_invalid(PlugstoreConfig::from_toml("[store]\npath = \" \"\n"), "store.path")?;
    assert_invalid(PlugstoreConfig::from_toml("[store]\nbusy_timeout_ms = 0\n"), "store.busy_timeout_ms")?;
    assert_invalid(
        PlugstoreConfig::from_toml("[gateway]\nrequest_timeout_ms = 0\n"),
        "gateway.request_timeout_ms",
    )?;
    assert_invalid(
        PlugstoreConfig::from_toml("[gateway]\nmax_body_bytes = 0\n"),
        "gateway.max_body_bytes",
    )?;
    assert_invalid(PlugstoreConfig::from_toml("[logging]\nlevel = \"\"\n"), "logging.level")?;
    assert_invalid(PlugstoreConfig::from_toml("[logging]\nformat = \"xml\"\n"), "config parse error")?;
    Ok(())
}
