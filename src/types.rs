//! Connection configuration, loaded once at startup.

use std::fmt;
use std::time::Duration;

use validator::Validate;

/// Default Bolt endpoint.
pub const DEFAULT_URI: &str = "bolt://localhost:7687";
/// Default principal.
pub const DEFAULT_USER: &str = "neo4j";
/// Default credential for the local development server.
pub const DEFAULT_PASSWORD: &str = "agenteai";
/// Default number of connection attempts.
pub const DEFAULT_MAX_RETRY: u32 = 3;
/// Default pause between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Default size of the driver's connection pool.
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;

const SUPPORTED_SCHEMES: &[&str] = &[
    "bolt://",
    "bolt+s://",
    "bolt+ssc://",
    "neo4j://",
    "neo4j+s://",
    "neo4j+ssc://",
];

fn validate_uri_scheme(uri: &str) -> Result<(), validator::ValidationError> {
    if SUPPORTED_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
        return Ok(());
    }
    Err(validator::ValidationError::new("unsupported_uri_scheme"))
}

/// Connection settings for a Neo4j server.
///
/// Built once (normally via [`ConnectionConfig::from_env`]) and handed by value
/// to [`crate::connection::ConnectionManager::connect`]. The manager never
/// reads the environment itself.
#[derive(Clone, PartialEq, Validate)]
pub struct ConnectionConfig {
    /// Bolt/neo4j endpoint, e.g. `bolt://localhost:7687`.
    #[validate(length(min = 1), custom(function = "validate_uri_scheme"))]
    pub uri: String,

    /// Principal used for basic auth.
    #[validate(length(min = 1))]
    pub user: String,

    /// Credential used for basic auth. Redacted from `Debug` output.
    #[validate(length(min = 1))]
    pub password: String,

    /// Target database; `None` uses the server default.
    #[validate(length(min = 1))]
    pub database: Option<String>,

    /// Total connection attempts before giving up (at least 1).
    #[validate(range(min = 1))]
    pub max_retry: u32,

    /// Constant pause between connection attempts.
    pub retry_delay: Duration,

    /// Upper bound on pooled connections held by the driver.
    #[validate(range(min = 1))]
    pub max_connections: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: None,
            max_retry: DEFAULT_MAX_RETRY,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_retry", &self.max_retry)
            .field("retry_delay", &self.retry_delay)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl ConnectionConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent),
    /// then reads `NEO4J_URI`, `NEO4J_USER`, `NEO4J_PASSWORD`, `NEO4J_DATABASE`,
    /// `NEO4J_MAX_RETRY`, `NEO4J_RETRY_DELAY_SECS` and `NEO4J_MAX_CONNECTIONS`,
    /// falling back to the defaults for anything unset. Malformed numbers
    /// return [`crate::ConnError::Validation`].
    ///
    /// Field validation is left to [`check`](Self::check) so that command-line
    /// overrides can replace bad environment values first.
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let uri = std::env::var("NEO4J_URI").unwrap_or_else(|_| DEFAULT_URI.to_string());

        let user = std::env::var("NEO4J_USER").unwrap_or_else(|_| DEFAULT_USER.to_string());

        let password =
            std::env::var("NEO4J_PASSWORD").unwrap_or_else(|_| DEFAULT_PASSWORD.to_string());

        let database = std::env::var("NEO4J_DATABASE")
            .ok()
            .filter(|db| !db.is_empty());

        let max_retry = match std::env::var("NEO4J_MAX_RETRY") {
            Ok(val) => val.parse::<u32>().map_err(|_| {
                crate::ConnError::Validation(
                    "NEO4J_MAX_RETRY must be a positive integer".to_string(),
                )
            })?,
            Err(_) => DEFAULT_MAX_RETRY,
        };

        let retry_delay = match std::env::var("NEO4J_RETRY_DELAY_SECS") {
            Ok(val) => val
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| {
                    crate::ConnError::Validation(
                        "NEO4J_RETRY_DELAY_SECS must be a non-negative number of seconds"
                            .to_string(),
                    )
                })?,
            Err(_) => DEFAULT_RETRY_DELAY,
        };

        let max_connections = match std::env::var("NEO4J_MAX_CONNECTIONS") {
            Ok(val) => val.parse::<usize>().map_err(|_| {
                crate::ConnError::Validation(
                    "NEO4J_MAX_CONNECTIONS must be a positive integer".to_string(),
                )
            })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            uri,
            user,
            password,
            database,
            max_retry,
            retry_delay,
            max_connections,
        })
    }

    /// Replace the endpoint and credentials with explicitly supplied values.
    ///
    /// `None` and empty strings leave the current value in place.
    pub fn with_overrides(
        mut self,
        uri: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Self {
        if let Some(uri) = uri.filter(|v| !v.is_empty()) {
            self.uri = uri;
        }
        if let Some(user) = user.filter(|v| !v.is_empty()) {
            self.user = user;
        }
        if let Some(password) = password.filter(|v| !v.is_empty()) {
            self.password = password;
        }
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, max_retry: u32, retry_delay: Duration) -> Self {
        self.max_retry = max_retry;
        self.retry_delay = retry_delay;
        self
    }

    /// Run field validation, mapping failures to [`crate::ConnError::Validation`].
    pub fn check(&self) -> crate::Result<()> {
        self.validate()
            .map_err(|e| crate::ConnError::Validation(e.to_string()))
    }
}
