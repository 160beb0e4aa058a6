use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://vocabulary.db";
const DEFAULT_DICTIONARY_API_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";
const DEFAULT_REFRESH_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub dictionary_api_url: String,
    pub admin_password: Option<String>,
    pub dashboard_refresh: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let dictionary_api_url =
            var("DICTIONARY_API_URL").unwrap_or_else(|| DEFAULT_DICTIONARY_API_URL.to_string());

        let admin_password = var("ADMIN_PASSWORD").filter(|value| !value.is_empty());

        let dashboard_refresh = var("DASHBOARD_REFRESH_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REFRESH_SECS));

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Self {
            database_url,
            dictionary_api_url,
            admin_password,
            dashboard_refresh,
            log_level,
        }
    }
}
