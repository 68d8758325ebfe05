// plc-logtrace - util/config.rs
//
// TOML-backed loading for EngineConfig, following the validate-then-use
// convention: deserialize the raw struct, then call `validate()` before
// handing it to any engine component.

use crate::core::model::EngineConfig;
use crate::util::error::{ConfigError, LogTraceError, Result};
use std::path::Path;

/// Loads and validates an `EngineConfig` from a TOML file.
pub fn load(path: &Path) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        LogTraceError::from(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    })?;
    parse(&raw, path)
}

/// Parses and validates an `EngineConfig` from an in-memory TOML string.
/// `path` is used for diagnostics only.
pub fn parse(raw: &str, path: &Path) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(raw).map_err(|source| {
        LogTraceError::from(ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_valid_config() {
        let toml = r#"
            worker_count = 4
            chunk_duration_seconds = 120.0
            max_resident_chunks = 8
        "#;
        let config = parse(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.max_resident_chunks, 8);
    }

    #[test]
    fn rejects_out_of_range_chunk_duration() {
        let toml = "chunk_duration_seconds = 0.0";
        let err = parse(toml, &PathBuf::from("test.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }
}
