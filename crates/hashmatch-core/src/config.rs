use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HashmatchError, HashmatchResult};

/// Top-level configuration (loaded from hashmatch.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashmatchConfig {
    pub key: KeyConfig,
    pub records: RecordsConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Key persistence file, relative to the working directory (default: secret.key)
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Zero-based index of the identifier column in plaintext inputs
    pub column: usize,
    /// Zero-based index of the digest column in hashed inputs
    pub digest_column: usize,
    /// Header written above hashed output
    pub hash_header: String,
    /// Header written above matched output
    pub match_header: String,
    /// What to do with a record that cannot be processed
    pub on_record_error: RecordErrorMode,
}

/// Per-record failure policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordErrorMode {
    /// Log a warning, report the record, keep going
    #[default]
    Skip,
    /// Fail the whole operation on the first bad record
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write outputs to a temp file and rename into place when complete
    pub atomic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("secret.key"),
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            column: 0,
            digest_column: 0,
            hash_header: "hashed_address".into(),
            match_header: "matched_address".into(),
            on_record_error: RecordErrorMode::Skip,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { atomic: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl HashmatchConfig {
    /// Load configuration from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> HashmatchResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| HashmatchError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| HashmatchError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> HashmatchResult<()> {
        if self.key.file.as_os_str().is_empty() {
            return Err(HashmatchError::Config("key.file must not be empty".into()));
        }
        if self.records.hash_header.is_empty() || self.records.match_header.is_empty() {
            return Err(HashmatchError::Config(
                "records.hash_header and records.match_header must not be empty".into(),
            ));
        }
        match self.logging.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(HashmatchError::Config(format!(
                "logging.format must be \"json\" or \"text\", got \"{other}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[key]
file = "/var/lib/hashmatch/partner-a.key"

[records]
column = 2
digest_column = 1
hash_header = "digest"
match_header = "overlap"
on_record_error = "abort"

[output]
atomic = false

[logging]
level = "debug"
format = "json"
"#;
        let config: HashmatchConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(
            config.key.file,
            PathBuf::from("/var/lib/hashmatch/partner-a.key")
        );
        assert_eq!(config.records.column, 2);
        assert_eq!(config.records.digest_column, 1);
        assert_eq!(config.records.hash_header, "digest");
        assert_eq!(config.records.match_header, "overlap");
        assert_eq!(config.records.on_record_error, RecordErrorMode::Abort);
        assert!(!config.output.atomic);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: HashmatchConfig = toml::from_str("").unwrap();

        assert_eq!(config.key.file, PathBuf::from("secret.key"));
        assert_eq!(config.records.column, 0);
        assert_eq!(config.records.digest_column, 0);
        assert_eq!(config.records.hash_header, "hashed_address");
        assert_eq!(config.records.match_header, "matched_address");
        assert_eq!(config.records.on_record_error, RecordErrorMode::Skip);
        assert!(config.output.atomic);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[records]
column = 1
"#;
        let config: HashmatchConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.records.column, 1);
        // Defaults
        assert_eq!(config.records.hash_header, "hashed_address");
        assert_eq!(config.key.file, PathBuf::from("secret.key"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = HashmatchConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.key.file, PathBuf::from("secret.key"));
    }

    #[test]
    fn test_load_rejects_bad_log_format() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hashmatch.toml");
        std::fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

        let err = HashmatchConfig::load(&path).unwrap_err();
        assert!(matches!(err, HashmatchError::Config(_)));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hashmatch.toml");
        std::fs::write(&path, "[records\ncolumn = ").unwrap();

        assert!(matches!(
            HashmatchConfig::load(&path),
            Err(HashmatchError::Config(_))
        ));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = HashmatchConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: HashmatchConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.key.file, parsed.key.file);
        assert_eq!(config.records.hash_header, parsed.records.hash_header);
        assert_eq!(config.records.on_record_error, parsed.records.on_record_error);
    }
}
