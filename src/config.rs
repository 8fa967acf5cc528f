use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub recordtree: RecordTreeConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    /// Ordered parent -> child rules. Absent means the built-in registry.
    #[serde(default)]
    pub relationships: Option<Vec<RelationshipRuleConfig>>,
    /// Entity type -> label field. Absent means the built-in label table.
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}

/// Core settings
#[derive(Debug, Clone, Deserialize)]
pub struct RecordTreeConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// One `[[relationships]]` entry: records of `child` whose `field` equals
/// the parent's id are children of a `parent` record.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RelationshipRuleConfig {
    pub parent: String,
    pub child: String,
    pub field: String,
}

fn default_http_enabled() -> bool {
    false
}

fn default_http_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_depth() -> u32 {
    3
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RECORDTREE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RECORDTREE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    /// Load and validate a specific config file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.recordtree.default_max_depth == 0 {
            anyhow::bail!("recordtree.default_max_depth must be greater than 0");
        }

        if let Some(rules) = &self.relationships {
            for (i, rule) in rules.iter().enumerate() {
                if rule.parent.trim().is_empty()
                    || rule.child.trim().is_empty()
                    || rule.field.trim().is_empty()
                {
                    anyhow::bail!(
                        "relationships[{}] must set non-empty parent, child and field",
                        i
                    );
                }
            }
        }

        if let Some(labels) = &self.labels {
            for (entity_type, field) in labels {
                if entity_type.trim().is_empty() || field.trim().is_empty() {
                    anyhow::bail!("labels entries must map a non-empty type to a non-empty field");
                }
            }
        }

        Ok(())
    }

    /// Fails unless `[http_server] enabled = true`
    pub fn require_http_server(&self) -> Result<()> {
        if !self.http_server.enabled {
            anyhow::bail!(
                "HTTP server is disabled. Set http_server.enabled = true in config.toml to serve hierarchies."
            );
        }
        Ok(())
    }

    /// Default depth as the signed value callers pass to `get_hierarchy_data`
    pub fn default_max_depth(&self) -> i64 {
        i64::from(self.recordtree.default_max_depth)
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.recordtree.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[recordtree]
db_path = "./test.db"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.db_path(), Path::new("./test.db"));
        assert_eq!(config.recordtree.log_level, "info");
        assert_eq!(config.recordtree.default_max_depth, 3);
        assert!(config.http_server.allowed_origins.is_empty());
        assert!(!config.http_server.enabled);
        assert!(config.require_http_server().is_err());
        assert_eq!(config.http_server.port, 8080);
        assert!(config.relationships.is_none());
        assert!(config.labels.is_none());
    }

    #[test]
    fn test_relationships_keep_declaration_order() {
        let config = Config::from_toml_str(
            r#"
[recordtree]
db_path = "./test.db"
default_max_depth = 2

[[relationships]]
parent = "Project"
child = "Task"
field = "ProjectId"

[[relationships]]
parent = "Project"
child = "Milestone"
field = "ProjectId"

[labels]
Project = "Title"
"#,
        )
        .unwrap();

        let rules = config.relationships.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].child, "Task");
        assert_eq!(rules[1].child, "Milestone");
        assert_eq!(config.labels.unwrap().get("Project").map(String::as_str), Some("Title"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = Config::from_toml_str(
            r#"
[recordtree]
db_path = "./test.db"
default_max_depth = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("default_max_depth"));
    }

    #[test]
    fn test_http_server_enabled() {
        let config = Config::from_toml_str(
            r#"
[recordtree]
db_path = "./test.db"

[http_server]
enabled = true
port = 9090
"#,
        )
        .unwrap();
        assert!(config.require_http_server().is_ok());
        assert_eq!(config.http_server.port, 9090);
    }

    #[test]
    fn test_out_of_range_depth_rejected() {
        for depth in ["-1", "5000000000"] {
            let result = Config::from_toml_str(&format!(
                "[recordtree]\ndb_path = \"./test.db\"\ndefault_max_depth = {}\n",
                depth
            ));
            assert!(result.is_err(), "depth {} should be rejected", depth);
        }

        let config = Config::from_toml_str(
            "[recordtree]\ndb_path = \"./test.db\"\ndefault_max_depth = 4000000000\n",
        )
        .unwrap();
        assert_eq!(config.default_max_depth(), 4_000_000_000);
    }

    #[test]
    fn test_blank_rule_rejected() {
        let result = Config::from_toml_str(
            r#"
[recordtree]
db_path = "./test.db"

[[relationships]]
parent = "Account"
child = ""
field = "AccountId"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, MINIMAL).unwrap();

        let original = std::env::var("RECORDTREE_CONFIG").ok();
        std::env::set_var("RECORDTREE_CONFIG", &config_path);
        let config = Config::load();
        std::env::remove_var("RECORDTREE_CONFIG");
        if let Some(v) = original {
            std::env::set_var("RECORDTREE_CONFIG", v);
        }

        assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
    }

    #[test]
    fn test_config_invalid_path() {
        let result = Config::load_from(Path::new("nonexistent.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("nonexistent.toml"));
    }
}
