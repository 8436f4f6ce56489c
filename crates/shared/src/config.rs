//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Report computation settings.
    #[serde(default)]
    pub reports: ReportSettings,
}

/// Accounting settings consulted while computing financial reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ReportSettings {
    /// Skip closing-balance snapshots and compute from ledger movement only.
    #[serde(default)]
    pub ignore_account_closing_balance: bool,
    /// Include opening entries in period movement.
    #[serde(default)]
    pub ignore_is_opening_check_for_reporting: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, lowest precedence first: `config/default`, `config/{RUN_MODE}`,
    /// then `FINSTAT__`-prefixed environment variables
    /// (e.g. `FINSTAT__REPORTS__IGNORE_ACCOUNT_CLOSING_BALANCE=true`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FINSTAT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
