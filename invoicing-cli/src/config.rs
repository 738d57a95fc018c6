//! `invoicing.toml` loading and tax rule resolution.
//!
//! ```toml
//! issuer_id = 1
//!
//! [database]
//! backend = "sqlite"
//! path = "invoices.db"
//!
//! [logging]
//! level = "info"
//! file = "invoicing.log"
//!
//! [tax_rules]
//! tax_year = 2026
//! vsdi_rate = "0.1252"
//! # ...every TaxRuleConstants field
//! ```

use std::io;
use std::path::{Path, PathBuf};

use invoicing_core::db::DbConfig;
use invoicing_core::{InvoiceRepository, RepositoryError, TaxCalculationError, TaxRuleConstants};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "invoicing.toml";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("invalid config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid [tax_rules]: {0}")]
    InvalidRules(#[from] TaxCalculationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Issuer whose invoices the commands operate on.
    pub issuer_id: i64,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Rule set used instead of the stored one for its `tax_year`.
    pub tax_rules: Option<TaxRuleConstants>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            issuer_id: 1,
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            tax_rules: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub backend: String,
    /// File path, or `:memory:`.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "invoices.db".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            backend: self.backend.clone(),
            connection_string: self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive; `RUST_LOG` wins when unset.
    pub level: Option<String>,
    /// Append log records to this file as well.
    pub file: Option<PathBuf>,
}

/// Reads the config file at `path`, or [`DEFAULT_CONFIG_FILE`] when `None`.
///
/// A missing default file yields the default configuration; a missing file
/// that was asked for explicitly is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path,
                message: e.to_string(),
            });
        }
    };

    parse_config(&text, &path)
}

/// Parses config text; `path` only labels errors.
pub fn parse_config(
    text: &str,
    path: &Path,
) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;
    if let Some(rules) = &config.tax_rules {
        rules.validate()?;
    }
    Ok(config)
}

/// Picks the rule set for `year`: the config override when it is for that
/// year, else the stored row, else the built-in 2025 rules.
pub async fn resolve_tax_rules<R: InvoiceRepository + ?Sized>(
    config: &AppConfig,
    repo: &R,
    year: i32,
) -> Result<TaxRuleConstants, RepositoryError> {
    if let Some(rules) = config.tax_rules.as_ref().filter(|r| r.tax_year == year) {
        debug!(year, "Using tax rules from config file");
        return Ok(rules.clone());
    }

    match repo.get_tax_rules(year).await {
        Ok(rules) => Ok(rules),
        Err(RepositoryError::NotFound) => {
            let fallback = TaxRuleConstants::lithuania_2025();
            warn!(
                year,
                fallback_year = fallback.tax_year,
                "No tax rules stored for year; using built-in rules"
            );
            Ok(fallback)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use invoicing_db_sqlite::SqliteRepository;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const RULES_2026: &str = r#"
[tax_rules]
tax_year = 2026
vsdi_rate = "0.1252"
psdi_rate = "0.0698"
gpm_rate = "0.05"
gpm_limit = "11900.00"
minimum_monthly_wage = "1153.00"
min_psd_monthly = "80.48"
flat_expense_rate = "0.30"
contribution_base_rate = "0.50"
"#;

    fn parse(text: &str) -> Result<AppConfig, ConfigError> {
        parse_config(text, Path::new("test.toml"))
    }

    async fn empty_repo() -> SqliteRepository {
        let repo = SqliteRepository::new(":memory:").await.unwrap();
        repo.run_migrations().await.unwrap();
        repo
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse(""), Ok(AppConfig::default()));
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse(
            r#"
issuer_id = 7

[database]
path = "/var/lib/invoicing/data.db"

[logging]
level = "debug"
file = "invoicing.log"
"#,
        )
        .unwrap();

        assert_eq!(config.issuer_id, 7);
        assert_eq!(
            config.database.to_db_config(),
            DbConfig {
                backend: "sqlite".to_string(),
                connection_string: "/var/lib/invoicing/data.db".to_string(),
            }
        );
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.file, Some(PathBuf::from("invoicing.log")));
    }

    #[test]
    fn tax_rules_section_is_parsed_exactly() {
        let config = parse(RULES_2026).unwrap();

        let rules = config.tax_rules.unwrap();
        assert_eq!(rules.tax_year, 2026);
        assert_eq!(rules.minimum_monthly_wage, dec!(1153.00));
        assert_eq!(rules.min_psd_monthly, dec!(80.48));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = parse("[database]\nurl = \"x\"\n");

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let text = RULES_2026.replace("vsdi_rate = \"0.1252\"", "vsdi_rate = \"12.52\"");

        let result = parse(&text);

        assert_eq!(
            result,
            Err(ConfigError::InvalidRules(TaxCalculationError::InvalidRate {
                name: "vsdi_rate",
                value: dec!(12.52),
            }))
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/invoicing.toml")));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    // =========================================================================
    // Rule resolution
    // =========================================================================

    #[tokio::test]
    async fn config_rules_win_for_their_year() {
        let repo = empty_repo().await;
        let config = parse(RULES_2026).unwrap();

        let rules = resolve_tax_rules(&config, &repo, 2026).await.unwrap();

        assert_eq!(rules.min_psd_monthly, dec!(80.48));
    }

    #[tokio::test]
    async fn stored_rules_used_when_config_is_for_another_year() {
        let repo = empty_repo().await;
        sqlx_insert_rules(&repo, 2025, "75.00").await;
        let config = parse(RULES_2026).unwrap();

        let rules = resolve_tax_rules(&config, &repo, 2025).await.unwrap();

        assert_eq!(rules.min_psd_monthly, dec!(75.00));
    }

    #[tokio::test]
    async fn falls_back_to_built_in_rules() {
        let repo = empty_repo().await;

        let rules = resolve_tax_rules(&AppConfig::default(), &repo, 2030)
            .await
            .unwrap();

        assert_eq!(rules, TaxRuleConstants::lithuania_2025());
    }

    async fn sqlx_insert_rules(
        repo: &SqliteRepository,
        year: i32,
        min_psd: &str,
    ) {
        sqlx::query(
            "INSERT INTO tax_rule_constants VALUES \
             (?, '0.1252', '0.0698', '0.05', '11900.00', '1038.00', ?, '0.30', '0.50')",
        )
        .bind(year)
        .bind(min_psd)
        .execute(repo.pool())
        .await
        .expect("Failed to insert tax rules");
    }
}
