use std::{env, fmt, sync::Arc, time::Duration};

use thiserror::Error;

/// Errors raised while reading the configuration at startup.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which hosting flavour the service runs as.
///
/// The only observable difference is the list of methods advertised in CORS
/// responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentTarget {
    Server,
    Serverless,
}

impl DeploymentTarget {
    pub fn allowed_methods(&self) -> &'static str {
        match self {
            DeploymentTarget::Server => "GET, POST, PUT, DELETE, OPTIONS",
            DeploymentTarget::Serverless => "POST, OPTIONS",
        }
    }
}

/// Fixed price table, in minor units (cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceCatalog {
    /// Price of the inspection itself.
    pub base: i64,
    /// Price of the optional CPR sign add-on.
    pub cpr_sign: i64,
}

impl Default for PriceCatalog {
    fn default() -> Self {
        PriceCatalog {
            base: 21000,
            cpr_sign: 3000,
        }
    }
}

/// Booking bodies are a few hundred bytes; anything near this is abuse.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
/// Configuration struct for the server.
///
/// Built once at startup and shared with every worker through `web::Data`.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// Selects the CORS method list.
    pub deployment: DeploymentTarget,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Optional path of a log file mirrored from the console.
    pub log_file: Option<String>,
    /// Wall-clock budget for a single call to the payment processor.
    pub processor_timeout: Duration,
    /// Server-side prices.
    pub catalog: PriceCatalog,
    /// Largest request body read, in bytes.
    pub max_body_bytes: usize,
    /// Stripe secret key
    pub stripe_secret_key: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("num_workers", &self.num_workers)
            .field("deployment", &self.deployment)
            .field("console_logging_enabled", &self.console_logging_enabled)
            .field("log_file", &self.log_file)
            .field("processor_timeout", &self.processor_timeout)
            .field("catalog", &self.catalog)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("stripe_secret_key", &"[redacted]")
            .finish()
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `STRIPE_SECRET_KEY`: Secret key used to talk to Stripe
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `DEPLOYMENT_TARGET`: "server" or "serverless" (default: "server")
    /// - `PROCESSOR_TIMEOUT_SECS`: Budget for the Stripe call (default: 9)
    /// - `BASE_PRICE_CENTS`: Inspection price (default: 21000)
    /// - `CPR_SIGN_PRICE_CENTS`: CPR sign add-on price (default: 3000)
    /// - `MAX_BODY_BYTES`: Request body limit (default: 65536)
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_FILE`: Optional log file path
    ///
    /// # Errors
    ///
    /// Fails if the Stripe key is missing or any value cannot be parsed.
    pub fn from_env() -> Result<Arc<Self>, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Arc<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let stripe_secret_key =
            var("STRIPE_SECRET_KEY").ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        let deployment = match var("DEPLOYMENT_TARGET").as_deref() {
            None | Some("server") => DeploymentTarget::Server,
            Some("serverless") => DeploymentTarget::Serverless,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "DEPLOYMENT_TARGET",
                    value: other.to_string(),
                });
            }
        };

        let timeout_secs: u64 = parse_or(var("PROCESSOR_TIMEOUT_SECS"), "PROCESSOR_TIMEOUT_SECS", 9)?;
        let catalog = PriceCatalog {
            base: positive(parse_or(var("BASE_PRICE_CENTS"), "BASE_PRICE_CENTS", 21000)?, "BASE_PRICE_CENTS")?,
            cpr_sign: positive(
                parse_or(var("CPR_SIGN_PRICE_CENTS"), "CPR_SIGN_PRICE_CENTS", 3000)?,
                "CPR_SIGN_PRICE_CENTS",
            )?,
        };

        Ok(Arc::new(Config {
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            server_host: var("IP").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(var("PORT"), "PORT", 8080)?,
            num_workers: parse_or(var("WORKERS"), "WORKERS", 4)?,
            deployment,
            console_logging_enabled: var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: var("LOG_FILE"),
            processor_timeout: Duration::from_secs(timeout_secs),
            catalog,
            max_body_bytes: parse_or(
                var("MAX_BODY_BYTES"),
                "MAX_BODY_BYTES",
                DEFAULT_MAX_BODY_BYTES,
            )?,
            stripe_secret_key,
        }))
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn positive(value: i64, name: &'static str) -> Result<i64, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}
