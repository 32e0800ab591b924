//! Runtime configuration from `STRAND_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contracts::{StrandError, ValidationError};
use crate::generator::{AttemptSpec, RendererKind, PLACEHOLDER};
use crate::sink::SinkConfig;

pub use crate::committer::CommitterConfig;

/// Table name pattern used when `STRAND_TABLE` is unset, formatted with the
/// local date at load time.
pub const DEFAULT_TABLE_PATTERN: &str = "attempts%m%d%y";

/// Everything the binary needs.
#[derive(Debug, Clone)]
pub struct StrandConfig {
    pub database: PathBuf,
    pub table: String,
    pub sink: SinkConfig,
    pub generation: GenerationConfig,
    pub committer: CommitterConfig,
    pub tail_poll: Duration,
}

impl Default for StrandConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("strand.db"),
            table: default_table_name(),
            sink: SinkConfig::default(),
            generation: GenerationConfig::default(),
            committer: CommitterConfig::default(),
            tail_poll: Duration::from_millis(500),
        }
    }
}

impl StrandConfig {
    /// Creates a config from environment variables.
    ///
    /// Environment variables:
    /// - `STRAND_DATABASE`: SQLite file or `:memory:` (default: strand.db)
    /// - `STRAND_TABLE`: record table (default: `attempts` + today's `%m%d%y`)
    /// - `STRAND_CACHE_TABLES`: table-existence cache (default: true)
    /// - `STRAND_TAIL_POLL_MS`: tail polling period (default: 500)
    ///
    /// plus the generation and committer variables. Numbers that do not parse
    /// fall back to their defaults; a malformed prohibited list or renderer
    /// name is an error.
    pub fn from_env() -> Result<Self, StrandError> {
        let default = Self::default();
        let database = std::env::var("STRAND_DATABASE")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(default.database);
        let table = std::env::var("STRAND_TABLE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(default.table);
        let cache_table_names = std::env::var("STRAND_CACHE_TABLES")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(default.sink.cache_table_names);
        let tail_poll = env_parse::<u64>("STRAND_TAIL_POLL_MS")
            .filter(|v| *v > 0)
            .map(Duration::from_millis)
            .unwrap_or(default.tail_poll);

        Ok(Self {
            database,
            table,
            sink: SinkConfig { cache_table_names },
            generation: GenerationConfig::from_env()?,
            committer: CommitterConfig::from_env(),
            tail_poll,
        })
    }
}

/// Parameters of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub length: usize,
    pub minimum: u32,
    pub maximum: u32,
    pub prohibited: Vec<String>,
    pub output_format: String,
    pub renderer: RendererKind,
    pub random: bool,
    /// Attempts to emit before stopping; random mode never stops without one
    pub limit: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            length: 5,
            minimum: 0,
            maximum: 255,
            prohibited: Vec::new(),
            output_format: PLACEHOLDER.to_string(),
            renderer: RendererKind::default(),
            random: false,
            limit: None,
        }
    }
}

impl GenerationConfig {
    /// Environment variables:
    /// - `STRAND_LENGTH` (default: 5)
    /// - `STRAND_MINIMUM` / `STRAND_MAXIMUM` (default: 0 / 255)
    /// - `STRAND_PROHIBITED`: JSON array of one-character strings
    /// - `STRAND_OUTPUT_FORMAT` (default: `{fuzzed_string}`)
    /// - `STRAND_RENDERER`: `byte` or `unicode` (default: byte)
    /// - `STRAND_RANDOM` (default: false)
    /// - `STRAND_LIMIT` (default: none)
    pub fn from_env() -> Result<Self, StrandError> {
        let default = Self::default();

        let prohibited = match std::env::var("STRAND_PROHIBITED") {
            Ok(raw) if !raw.trim().is_empty() => parse_prohibited_json(&raw)?,
            _ => default.prohibited,
        };
        let renderer = match std::env::var("STRAND_RENDERER") {
            Ok(raw) if !raw.trim().is_empty() => {
                RendererKind::from_str(&raw).map_err(StrandError::Config)?
            }
            _ => default.renderer,
        };

        Ok(Self {
            length: env_parse("STRAND_LENGTH").unwrap_or(default.length),
            minimum: env_parse("STRAND_MINIMUM").unwrap_or(default.minimum),
            maximum: env_parse("STRAND_MAXIMUM").unwrap_or(default.maximum),
            prohibited,
            output_format: std::env::var("STRAND_OUTPUT_FORMAT").unwrap_or(default.output_format),
            renderer,
            random: std::env::var("STRAND_RANDOM")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default.random),
            limit: env_parse("STRAND_LIMIT").or(default.limit),
        })
    }

    /// Validates into an [`AttemptSpec`].
    pub fn to_spec(&self) -> Result<AttemptSpec, ValidationError> {
        AttemptSpec::builder()
            .length(self.length)
            .range(self.minimum, self.maximum)
            .prohibit(self.prohibited.iter().cloned())
            .output_format(self.output_format.clone())
            .renderer_kind(self.renderer)
            .build()
    }
}

/// `attempts` followed by today's local date as `%m%d%y`.
pub fn default_table_name() -> String {
    chrono::Local::now().format(DEFAULT_TABLE_PATTERN).to_string()
}

/// Parses a JSON array of strings. Entry length is checked later, when the
/// spec is built.
pub fn parse_prohibited_json(raw: &str) -> Result<Vec<String>, StrandError> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|e| StrandError::Config(format!("STRAND_PROHIBITED is not a JSON string array: {}", e)))
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests in this module mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 11] = [
        "STRAND_DATABASE",
        "STRAND_TABLE",
        "STRAND_CACHE_TABLES",
        "STRAND_LENGTH",
        "STRAND_MINIMUM",
        "STRAND_MAXIMUM",
        "STRAND_PROHIBITED",
        "STRAND_OUTPUT_FORMAT",
        "STRAND_RENDERER",
        "STRAND_RANDOM",
        "STRAND_LIMIT",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        let config = StrandConfig::from_env().unwrap();
        assert_eq!(config.database, PathBuf::from("strand.db"));
        assert!(config.table.starts_with("attempts"));
        assert_eq!(config.table.len(), "attempts".len() + 6);
        assert!(config.sink.cache_table_names);
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn reads_generation_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        std::env::set_var("STRAND_LENGTH", "2");
        std::env::set_var("STRAND_MINIMUM", "97");
        std::env::set_var("STRAND_MAXIMUM", "99");
        std::env::set_var("STRAND_PROHIBITED", r#"["b"]"#);
        std::env::set_var("STRAND_OUTPUT_FORMAT", "<{fuzzed_string}>");
        std::env::set_var("STRAND_RANDOM", "true");
        std::env::set_var("STRAND_LIMIT", "10");
        std::env::set_var("STRAND_CACHE_TABLES", "0");

        let config = StrandConfig::from_env().unwrap();
        let generation = &config.generation;
        assert_eq!(generation.length, 2);
        assert_eq!((generation.minimum, generation.maximum), (97, 99));
        assert_eq!(generation.prohibited, vec!["b".to_string()]);
        assert!(generation.random);
        assert_eq!(generation.limit, Some(10));
        assert!(!config.sink.cache_table_names);

        let spec = generation.to_spec().unwrap();
        assert!(spec.is_prohibited('b'));
        assert_eq!(spec.length(), 2);

        clear();
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        std::env::set_var("STRAND_LENGTH", "five");
        std::env::set_var("STRAND_MAXIMUM", "-1");

        let generation = GenerationConfig::from_env().unwrap();
        assert_eq!(generation.length, 5);
        assert_eq!(generation.maximum, 255);

        clear();
    }

    #[test]
    fn malformed_prohibited_list_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        std::env::set_var("STRAND_PROHIBITED", "a,b");
        assert!(matches!(
            GenerationConfig::from_env(),
            Err(StrandError::Config(_))
        ));
        clear();
    }

    #[test]
    fn unknown_renderer_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        std::env::set_var("STRAND_RENDERER", "ebcdic");
        assert!(GenerationConfig::from_env().is_err());
        clear();
    }

    #[test]
    fn multi_character_entry_fails_at_spec_build() {
        let generation = GenerationConfig {
            prohibited: vec!["ab".into()],
            ..GenerationConfig::default()
        };
        assert!(matches!(
            generation.to_spec(),
            Err(ValidationError::ProhibitedEntry(_))
        ));
    }
}
