// common/src/config.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, ConfigError, Environment, File};
use url::Url;

/// Plain environment names the dashboard has always been configured with,
/// mapped onto their place in the layered configuration.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("WEB_SERVER_ADDR", "web_server_addr"),
    ("SITE_TITLE", "site_title"),
    ("SERVERS", "servers"),
    ("SERVERS_ID", "servers_id"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("ALLOWED_EMAILS", "auth.allowed_emails"),
    ("NO_NEED_LOGIN", "auth.no_need_login"),
    ("TOKEN", "auth.bypass_token"),
    ("DEVOPS", "auth.devops_contact"),
    ("SMTP_HOST", "smtp.host"),
    ("SMTP_PORT", "smtp.port"),
    ("SMTP_SECURE", "smtp.secure"),
    ("SMTP_USER", "smtp.user"),
    ("SMTP_PASS", "smtp.pass"),
    ("ACCESS_LOG_PATH", "access_log.path"),
    ("TZ", "access_log.timezone"),
    ("STATIC_FILES_PATH", "static_files.path"),
];

/// A backend GPU monitoring endpoint. The id is the key it is stored under.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub url: String,
    /// Sent verbatim as the `Authorization` header when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Central configuration, loaded once at startup and read-only afterwards
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub site_title: String,
    pub auth: AuthConfig,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: BTreeMap<String, ServerDescriptor>,
    /// Display order of the server panels; empty means every descriptor, sorted by id
    #[serde(deserialize_with = "deserialize_list")]
    pub servers_id: Vec<String>,

    pub smtp: SmtpConfig,
    pub access_log: AccessLogConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Empty means every syntactically valid mailbox may log in
    #[serde(deserialize_with = "deserialize_list")]
    pub allowed_emails: Vec<String>,
    pub no_need_login: bool,
    pub bypass_token: Option<String>,
    pub devops_contact: String,
    pub public_paths: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: String,
    pub pass: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessLogConfig {
    pub path: PathBuf,
    /// IANA zone name used for the human-readable access time
    pub timezone: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: PathBuf,
    pub index: String,
    pub login: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:3000".to_string(),
            site_title: "GPU Dashboard".to_string(),
            auth: AuthConfig::default(),
            servers: BTreeMap::new(),
            servers_id: Vec::new(),
            smtp: SmtpConfig::default(),
            access_log: AccessLogConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            allowed_emails: Vec::new(),
            no_need_login: false,
            bypass_token: None,
            devops_contact: "the administrator".to_string(),
            public_paths: vec![
                "/login".to_string(),
                "/api/auth".to_string(),
                "/static".to_string(),
                "/favicon.ico".to_string(),
            ],
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            secure: false,
            user: String::new(),
            pass: String::new(),
        }
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/log/access.csv"),
            timezone: "Asia/Shanghai".to_string(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./static"),
            index: "index.html".to_string(),
            login: "login.html".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment, then validate it.
    pub fn load() -> Result<Self, ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let mut builder = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"));

        for (var, key) in LEGACY_ENV {
            if let Ok(value) = env::var(var) {
                if !legacy_value_applies(var, &value) {
                    tracing::warn!("Ignoring {}={:?}: not an IANA timezone name, keeping the configured zone", var, value);
                    continue;
                }
                builder = builder.set_override(*key, value)?;
            }
        }

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Drop empty entries that come from blank environment values.
    pub fn normalize(&mut self) {
        self.auth.allowed_emails.retain(|email| !email.is_empty());
        self.servers_id.retain(|id| !id.is_empty());
        if self.auth.bypass_token.as_deref().is_some_and(str::is_empty) {
            self.auth.bypass_token = None;
        }
    }

    /// Fail fast on anything that would otherwise only surface per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.auth.no_need_login {
            if self.auth.jwt_secret.is_empty() {
                return Err(ConfigError::Message("JWT_SECRET must be set unless NO_NEED_LOGIN is enabled".into()));
            }
            if self.smtp.host.is_empty() {
                return Err(ConfigError::Message("SMTP_HOST must be set unless NO_NEED_LOGIN is enabled".into()));
            }
        }

        for (id, server) in &self.servers {
            let url = Url::parse(&server.url)
                .map_err(|e| ConfigError::Message(format!("server {id}: invalid url {:?}: {e}", server.url)))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Message(format!("server {id}: unsupported scheme {}", url.scheme())));
            }
        }

        if let Some(missing) = self.servers_id.iter().find(|id| !self.servers.contains_key(*id)) {
            return Err(ConfigError::Message(format!("SERVERS_ID references unknown server {missing}")));
        }

        self.access_log_timezone()?;
        Ok(())
    }

    /// Server ids in the order the dashboard should show them.
    pub fn display_order(&self) -> Vec<String> {
        if self.servers_id.is_empty() {
            self.servers.keys().cloned().collect()
        } else {
            self.servers_id.clone()
        }
    }

    pub fn access_log_timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.access_log
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| ConfigError::Message(format!("invalid access log timezone {:?}: {e}", self.access_log.timezone)))
    }
}

/// `TZ` is shared with libc, which also accepts POSIX forms such as
/// `:/etc/localtime`; only IANA names are taken as the access log zone.
fn legacy_value_applies(var: &str, value: &str) -> bool {
    var != "TZ" || value.parse::<chrono_tz::Tz>().is_ok()
}

/// Accepts either a list or a comma-separated string.
fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(raw) => raw.split(',').map(|item| item.trim().to_string()).collect(),
    })
}

/// Accepts either a table (config files) or a JSON object string (the `SERVERS` variable).
fn deserialize_servers<'de, D>(deserializer: D) -> Result<BTreeMap<String, ServerDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TableOrJson {
        Table(BTreeMap<String, ServerDescriptor>),
        Json(String),
    }

    match TableOrJson::deserialize(deserializer)? {
        TableOrJson::Table(servers) => Ok(servers),
        TableOrJson::Json(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
        TableOrJson::Json(raw) => serde_json::from_str(&raw)
            .map_err(|e| serde::de::Error::custom(format!("SERVERS is not a valid descriptor mapping: {e}"))),
    }
}
