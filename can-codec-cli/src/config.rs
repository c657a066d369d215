//! Configuration loading and parsing

use anyhow::{Context, Result};
use can_codec::CompilerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub dbc_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output file (default: stdout)
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub pretty: bool,
    /// Stamp the document with its generation time
    #[serde(default)]
    pub timestamp: bool,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_codec::OverlapPolicy;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            dbc_files = ["powertrain.dbc", "body.dbc"]

            [compiler]
            overlap_policy = "reject"
            abort_on_error = false

            [output]
            path = "codecs.json"
            pretty = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.dbc_files.len(), 2);
        assert_eq!(config.compiler.overlap_policy, OverlapPolicy::Reject);
        assert!(!config.compiler.abort_on_error);
        // unspecified compiler keys keep their defaults
        assert!(config.compiler.check_dlc);
        assert_eq!(config.output.path, Some(PathBuf::from("codecs.json")));
        assert!(config.output.pretty);
        assert!(!config.output.timestamp);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.dbc_files.is_empty());
        assert_eq!(config.compiler, CompilerConfig::default());
        assert!(config.output.path.is_none());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compiler]\noverlap_policy = \"ignore\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.compiler.overlap_policy, OverlapPolicy::Ignore);
    }

    #[test]
    fn test_load_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));

        let invalid = dir.path().join("invalid.toml");
        fs::write(&invalid, "[compiler]\noverlap_policy = \"sometimes\"").unwrap();
        let err = load_config(&invalid).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
