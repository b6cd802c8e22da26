use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::enricher::EnrichOptions;
use crate::insights::DEFAULT_HIGH_PERFORMER_THRESHOLD;
use crate::roles::{Role, RoleTaxonomy};
use crate::schema_matcher::{SchemaMatcher, DEFAULT_AUTHOR_CARDINALITY};

pub const DEFAULT_TOPIC_KEYWORD: &str = "google";
pub const DEFAULT_BRAND: &str = "Main Brand";
pub const DEFAULT_TOP_POSTS: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config names unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// On-disk shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    topic_keyword: Option<String>,
    high_performer_threshold: Option<u64>,
    include_reposts: Option<bool>,
    required_roles: Option<Vec<String>>,
    author_cardinality_threshold: Option<usize>,
    default_brand: Option<String>,
    top_posts: Option<usize>,
    #[serde(default)]
    aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub topic_keyword: String,
    pub high_performer_threshold: u64,
    pub include_reposts: bool,
    pub required_roles: Vec<Role>,
    pub author_cardinality_threshold: usize,
    pub default_brand: String,
    pub top_posts: usize,
    pub extra_aliases: BTreeMap<Role, Vec<String>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            topic_keyword: DEFAULT_TOPIC_KEYWORD.to_string(),
            high_performer_threshold: DEFAULT_HIGH_PERFORMER_THRESHOLD,
            include_reposts: true,
            required_roles: Role::INTERACTIONS.to_vec(),
            author_cardinality_threshold: DEFAULT_AUTHOR_CARDINALITY,
            default_brand: DEFAULT_BRAND.to_string(),
            top_posts: DEFAULT_TOP_POSTS,
            extra_aliases: BTreeMap::new(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded analyzer config");
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let include_reposts = file.include_reposts.unwrap_or(defaults.include_reposts);
        let required_roles = match file.required_roles {
            Some(names) => names
                .iter()
                .map(|name| parse_role(name))
                .collect::<Result<Vec<_>, _>>()?,
            None if include_reposts => defaults.required_roles,
            None => vec![Role::Likes, Role::Comments],
        };

        let mut extra_aliases = BTreeMap::new();
        for (name, aliases) in file.aliases {
            let role = parse_role(&name)?;
            extra_aliases
                .entry(role)
                .or_insert_with(Vec::new)
                .extend(aliases);
        }

        let config = Self {
            topic_keyword: file.topic_keyword.unwrap_or(defaults.topic_keyword),
            high_performer_threshold: file
                .high_performer_threshold
                .unwrap_or(defaults.high_performer_threshold),
            include_reposts,
            required_roles,
            author_cardinality_threshold: file
                .author_cardinality_threshold
                .unwrap_or(defaults.author_cardinality_threshold),
            default_brand: file.default_brand.unwrap_or(defaults.default_brand),
            top_posts: file.top_posts.unwrap_or(defaults.top_posts),
            extra_aliases,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic_keyword.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "topic_keyword",
                reason: "must not be empty".to_string(),
            });
        }
        if self.default_brand.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "default_brand",
                reason: "must not be empty".to_string(),
            });
        }
        if self.author_cardinality_threshold == 0 {
            return Err(ConfigError::Invalid {
                key: "author_cardinality_threshold",
                reason: "must be at least 1".to_string(),
            });
        }

        let mut needed = vec![Role::Likes, Role::Comments];
        if self.include_reposts {
            needed.push(Role::Reposts);
        }
        if let Some(role) = needed.iter().find(|role| !self.required_roles.contains(role)) {
            return Err(ConfigError::Invalid {
                key: "required_roles",
                reason: format!("must contain '{role}'"),
            });
        }
        Ok(())
    }

    /// Role taxonomy with configured aliases appended to the defaults.
    pub fn taxonomy(&self) -> RoleTaxonomy {
        self.extra_aliases
            .iter()
            .fold(RoleTaxonomy::default(), |taxonomy, (role, aliases)| {
                taxonomy.with_extra_aliases(*role, aliases.iter().cloned())
            })
    }

    pub fn matcher(&self) -> SchemaMatcher {
        SchemaMatcher::new(self.taxonomy()).with_author_cardinality(self.author_cardinality_threshold)
    }

    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            topic_keyword: self.topic_keyword.clone(),
            include_reposts: self.include_reposts,
            required_roles: self.required_roles.clone(),
        }
    }
}

fn parse_role(name: &str) -> Result<Role, ConfigError> {
    Role::from_str(name).map_err(|_| ConfigError::UnknownRole(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AnalyzerConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.topic_keyword, "google");
        assert_eq!(config.high_performer_threshold, 10);
        assert_eq!(config.default_brand, "Main Brand");
        assert_eq!(
            config.required_roles,
            vec![Role::Likes, Role::Comments, Role::Reposts]
        );
    }

    #[test]
    fn overrides_and_aliases_are_applied() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
topic_keyword = "Rust"
high_performer_threshold = 25
include_reposts = false
top_posts = 3

[aliases]
likes = ["hearts"]
brand = ["org_name"]
"#,
        )
        .unwrap();

        assert_eq!(config.topic_keyword, "Rust");
        assert_eq!(config.high_performer_threshold, 25);
        assert!(!config.include_reposts);
        assert_eq!(config.required_roles, vec![Role::Likes, Role::Comments]);
        assert_eq!(config.top_posts, 3);
        assert_eq!(config.enrich_options().summed_roles(), vec![Role::Likes, Role::Comments]);

        let taxonomy = config.taxonomy();
        assert_eq!(taxonomy.spec(Role::Likes).aliases.last().map(String::as_str), Some("hearts"));
        assert_eq!(
            taxonomy.spec(Role::Author).aliases.last().map(String::as_str),
            Some("org_name")
        );
    }

    #[test]
    fn rejects_unknown_roles_and_bad_values() {
        let err = AnalyzerConfig::from_toml_str("[aliases]\nfollowers = [\"fans\"]").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRole(ref name) if name == "followers"));

        let err = AnalyzerConfig::from_toml_str("topic_keyword = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "topic_keyword", .. }));

        let err = AnalyzerConfig::from_toml_str("required_roles = [\"likes\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "required_roles", .. }));

        let err = AnalyzerConfig::from_toml_str("mystery = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AnalyzerConfig::load(Path::new("/nonexistent/postlens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
