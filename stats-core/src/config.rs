//! On-disk configuration.
//!
//! ```toml
//! [sites.reddit]
//! client_id = "..."
//! client_secret = "..."
//! username = "stats_bot"
//! password = "..."          # optional, falls back to $SUBREDDIT_STATS_PASSWORD
//!
//! [report]
//! max_body_size = 10000
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "subreddit_stats.toml";
pub const DEFAULT_SITE: &str = "reddit";
pub const PASSWORD_ENV_VAR: &str = "SUBREDDIT_STATS_PASSWORD";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sites: HashMap<String, SiteConfig>,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub title_prefix: String,
    pub marker_label: String,
    pub max_body_size: usize,
    pub recency_guard_days: u32,
    pub top_submissions: usize,
    pub top_comments: usize,
    /// Listing page size, Reddit caps it at 100.
    pub page_limit: u32,
    /// Budget of `morechildren` calls per submission before giving up on
    /// the rest of the thread.
    pub max_more_requests: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title_prefix: "Subreddit Stats:".to_string(),
            marker_label: "SRS Marker".to_string(),
            max_body_size: 10000,
            recency_guard_days: 3,
            top_submissions: 5,
            top_comments: 5,
            page_limit: 100,
            max_more_requests: 32,
        }
    }
}

/// Fully resolved login for one run.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.report.page_limit == 0 || self.report.page_limit > 100 {
            return Err(ConfigError::InvalidValue {
                field: "report.page_limit".to_string(),
                value: self.report.page_limit.to_string(),
            });
        }
        if self.report.title_prefix.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "report.title_prefix".to_string(),
            });
        }
        if self.report.marker_label.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "report.marker_label".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the login for `site`.
    ///
    /// Command line values win over the config file; the password falls back
    /// to the `SUBREDDIT_STATS_PASSWORD` environment variable. A password
    /// without a username is rejected.
    pub fn credentials(
        &self,
        site: &str,
        user: Option<&str>,
        password: Option<&str>,
        default_user_agent: &str,
    ) -> Result<Credentials, ConfigError> {
        if password.is_some() && user.is_none() {
            return Err(ConfigError::ConflictingOptions {
                reason: "--pswd can only be used in combination with --user".to_string(),
            });
        }

        let site_config = self.sites.get(site).ok_or_else(|| ConfigError::UnknownSite {
            site: site.to_string(),
        })?;

        let username = user
            .map(str::to_string)
            .or_else(|| site_config.username.clone())
            .ok_or_else(|| ConfigError::MissingField {
                field: format!("sites.{}.username", site),
            })?;

        // An explicit --user never reuses the configured account's password.
        let configured_password = match user {
            Some(_) => None,
            None => site_config.password.clone(),
        };
        let password = match password.map(str::to_string).or(configured_password) {
            Some(password) => password,
            None => std::env::var(PASSWORD_ENV_VAR).map_err(|_| ConfigError::MissingField {
                field: format!("sites.{}.password", site),
            })?,
        };

        Ok(Credentials {
            client_id: site_config.client_id.clone(),
            client_secret: site_config.client_secret.clone(),
            username,
            password,
            user_agent: site_config
                .user_agent
                .clone()
                .unwrap_or_else(|| default_user_agent.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [sites.reddit]
        client_id = "abc"
        client_secret = "shh"
        username = "stats_bot"
        password = "hunter2"

        [sites.staging]
        client_id = "def"
        client_secret = "shh2"

        [report]
        max_body_size = 40000
    "#;

    #[test]
    fn test_defaults_fill_missing_report_fields() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.report.max_body_size, 40000);
        assert_eq!(config.report.title_prefix, "Subreddit Stats:");
        assert_eq!(config.report.recency_guard_days, 3);
        assert_eq!(config.report.top_submissions, 5);
    }

    #[test]
    fn test_config_file_credentials() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let creds = config.credentials("reddit", None, None, "ua/1.0").unwrap();
        assert_eq!(creds.username, "stats_bot");
        assert_eq!(creds.password, "hunter2");
        assert_eq!(creds.user_agent, "ua/1.0");
    }

    #[test]
    fn test_command_line_overrides_config() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let creds = config
            .credentials("reddit", Some("other"), Some("pw"), "ua/1.0")
            .unwrap();
        assert_eq!(creds.username, "other");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn test_password_requires_user() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let result = config.credentials("reddit", None, Some("pw"), "ua/1.0");
        assert!(matches!(result, Err(ConfigError::ConflictingOptions { .. })));
    }

    #[test]
    fn test_unknown_site() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let result = config.credentials("nowhere", None, None, "ua/1.0");
        assert!(matches!(result, Err(ConfigError::UnknownSite { .. })));
    }

    #[test]
    fn test_missing_username() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let result = config.credentials("staging", None, None, "ua/1.0");
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_invalid_page_limit() {
        let result = AppConfig::from_toml_str("[report]\npage_limit = 500\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_error() {
        let result = AppConfig::from_toml_str("[sites.reddit\nclient_id = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
