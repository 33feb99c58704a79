use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AppError;

pub const DEFAULT_SERVICE_NAME: &str = "portfolio-battle";

/// Subscriber settings, read from the same env lookup as `AppConfig`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, `RUST_LOG`
    pub filter: String,
    pub service_name: String,
    pub environment: String,
    /// Loki push endpoint. `None` keeps logs on the console only.
    pub loki_url: Option<url::Url>,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(&filter)
            .map_err(|e| AppError::Config(format!("RUST_LOG '{}' is invalid: {}", filter, e)))?;

        let service_name = non_blank(&lookup, "SERVICE_NAME", DEFAULT_SERVICE_NAME)?;
        let environment = non_blank(&lookup, "ENVIRONMENT", "development")?;

        let loki_enabled = match lookup("LOKI_ENABLED") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                AppError::Config(format!("LOKI_ENABLED must be true or false, got '{}'", raw))
            })?,
            None => false,
        };

        let loki_url = if loki_enabled {
            let raw = lookup("LOKI_URL").ok_or_else(|| {
                AppError::Config("LOKI_ENABLED is true but LOKI_URL is not set".to_string())
            })?;
            let url = url::Url::parse(raw.trim())
                .map_err(|e| AppError::Config(format!("LOKI_URL '{}' is invalid: {}", raw, e)))?;
            Some(url)
        } else {
            None
        };

        Ok(Self {
            filter,
            service_name,
            environment,
            loki_url,
        })
    }
}

fn non_blank<F>(lookup: &F, key: &str, default: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if v.trim().is_empty() => Err(AppError::Config(format!("{} is set but empty", key))),
        Some(v) => Ok(v.trim().to_string()),
        None => Ok(default.to_string()),
    }
}

/// Installs the global subscriber: env filter, console output and, when
/// configured, a Loki layer labelled with service and environment.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "loki")]
    let registry = registry.with(loki_layer(config)?);

    registry
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialized: {}", e)))?;

    match &config.loki_url {
        #[cfg(feature = "loki")]
        Some(url) => tracing::info!("✅ Loki logging initialized at {}", url),
        #[cfg(not(feature = "loki"))]
        Some(_) => tracing::warn!("LOKI_ENABLED is set but the loki feature is off, logging to console only"),
        None => tracing::info!(
            "📊 Console logging initialized ({} / {})",
            config.service_name,
            config.environment
        ),
    }

    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig) -> Result<Option<tracing_loki::Layer>, AppError> {
    let Some(url) = config.loki_url.clone() else {
        return Ok(None);
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| AppError::Config(format!("failed to build Loki layer: {}", e)))?;

    // Spawn the background task that sends logs to Loki
    tokio::spawn(task);

    Ok(Some(layer))
}
