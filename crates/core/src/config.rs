use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Storefront identity and session wiring.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub name: String,
    pub currency: String,
    pub cart_session_key: String,
    pub session_cookie: String,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub enabled: bool,
    pub api_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub from_address: String,
    pub operator_address: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
    pub mail_enabled: Option<bool>,
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shopfront.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            store: StoreConfig {
                name: "Shopfront".to_string(),
                currency: "USD".to_string(),
                cart_session_key: "cart".to_string(),
                session_cookie: "shopfront_session".to_string(),
            },
            mail: MailConfig {
                enabled: false,
                api_url: None,
                api_token: None,
                from_address: "orders@shopfront.example".to_string(),
                operator_address: "shop@shopfront.example".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopfront.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(store) = patch.store {
            if let Some(name) = store.name {
                self.store.name = name;
            }
            if let Some(currency) = store.currency {
                self.store.currency = currency;
            }
            if let Some(cart_session_key) = store.cart_session_key {
                self.store.cart_session_key = cart_session_key;
            }
            if let Some(session_cookie) = store.session_cookie {
                self.store.session_cookie = session_cookie;
            }
        }

        if let Some(mail) = patch.mail {
            if let Some(enabled) = mail.enabled {
                self.mail.enabled = enabled;
            }
            if let Some(api_url) = mail.api_url {
                self.mail.api_url = Some(api_url);
            }
            if let Some(mail_api_token_value) = mail.api_token {
                self.mail.api_token = Some(secret_value(mail_api_token_value));
            }
            if let Some(from_address) = mail.from_address {
                self.mail.from_address = from_address;
            }
            if let Some(operator_address) = mail.operator_address {
                self.mail.operator_address = operator_address;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPFRONT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SHOPFRONT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHOPFRONT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPFRONT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPFRONT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPFRONT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SHOPFRONT_SERVER_PORT") {
            self.server.port = parse_u16("SHOPFRONT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SHOPFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SHOPFRONT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPFRONT_STORE_NAME") {
            self.store.name = value;
        }
        if let Some(value) = read_env("SHOPFRONT_STORE_CURRENCY") {
            self.store.currency = value;
        }
        if let Some(value) = read_env("SHOPFRONT_STORE_CART_SESSION_KEY") {
            self.store.cart_session_key = value;
        }
        if let Some(value) = read_env("SHOPFRONT_STORE_SESSION_COOKIE") {
            self.store.session_cookie = value;
        }

        if let Some(value) = read_env("SHOPFRONT_MAIL_ENABLED") {
            self.mail.enabled = parse_bool("SHOPFRONT_MAIL_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SHOPFRONT_MAIL_API_URL") {
            self.mail.api_url = Some(value);
        }
        if let Some(value) = read_env("SHOPFRONT_MAIL_API_TOKEN") {
            self.mail.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPFRONT_MAIL_FROM_ADDRESS") {
            self.mail.from_address = value;
        }
        if let Some(value) = read_env("SHOPFRONT_MAIL_OPERATOR_ADDRESS") {
            self.mail.operator_address = value;
        }

        let log_level =
            read_env("SHOPFRONT_LOGGING_LEVEL").or_else(|| read_env("SHOPFRONT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPFRONT_LOGGING_FORMAT").or_else(|| read_env("SHOPFRONT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(mail_enabled) = overrides.mail_enabled {
            self.mail.enabled = mail_enabled;
        }
        if let Some(mail_api_url) = overrides.mail_api_url {
            self.mail.api_url = Some(mail_api_url);
        }
        if let Some(mail_api_token) = overrides.mail_api_token {
            self.mail.api_token = Some(secret_value(mail_api_token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_store(&self.store)?;
        validate_mail(&self.mail)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopfront.toml"), PathBuf::from("config/shopfront.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.name.trim().is_empty() {
        return Err(ConfigError::Validation("store.name must not be blank".to_string()));
    }

    if store.cart_session_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store.cart_session_key must not be blank".to_string(),
        ));
    }

    let cookie_ok = !store.session_cookie.is_empty()
        && store
            .session_cookie
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !cookie_ok {
        return Err(ConfigError::Validation(
            "store.session_cookie must be a non-empty cookie name (alphanumeric, `_`, `-`)"
                .to_string(),
        ));
    }

    let currency = store.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "store.currency must be a three-letter uppercase code (for example `USD`)".to_string(),
        ));
    }

    Ok(())
}

fn validate_mail(mail: &MailConfig) -> Result<(), ConfigError> {
    if mail.enabled {
        let url_missing = mail.api_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if url_missing {
            return Err(ConfigError::Validation(
                "mail.api_url is required when mail.enabled is true".to_string(),
            ));
        }
        if let Some(api_url) = &mail.api_url {
            if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                return Err(ConfigError::Validation(
                    "mail.api_url must start with http:// or https://".to_string(),
                ));
            }
        }

        let token_missing = mail
            .api_token
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if token_missing {
            return Err(ConfigError::Validation(
                "mail.api_token is required when mail.enabled is true".to_string(),
            ));
        }
    }

    if !mail.from_address.contains('@') {
        return Err(ConfigError::Validation(
            "mail.from_address must be an email address".to_string(),
        ));
    }
    if !mail.operator_address.contains('@') {
        return Err(ConfigError::Validation(
            "mail.operator_address must be an email address".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    store: Option<StorePatch>,
    mail: Option<MailPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    name: Option<String>,
    currency: Option<String>,
    cart_session_key: Option<String>,
    session_cookie: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MailPatch {
    enabled: Option<bool>,
    api_url: Option<String>,
    api_token: Option<String>,
    from_address: Option<String>,
    operator_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
