use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub queries: QueriesConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            enable_cors: true,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// Backend store endpoints and credentials (basic auth, optional).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub loki_url: String,
    pub prometheus_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            loki_url: "http://localhost:3100".to_string(),
            prometheus_url: "http://localhost:9090".to_string(),
            username: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

/// The log queries feeding the event feed, one per source format. Routing
/// happens by query: each result set goes to exactly one parser.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogQueriesConfig {
    pub audit: String,
    pub signup: String,
    pub action: String,
    pub plan: String,
}

impl Default for LogQueriesConfig {
    fn default() -> Self {
        Self {
            audit: r#"{app="audit-log"} |= "action""#.to_string(),
            signup: r#"{app="signup-flow"} |= "email=""#.to_string(),
            action: r#"{app="control-plane"} |= "msg=""#.to_string(),
            plan: r#"{app="billing-gateway"} |= "/api/v1/billing/plan""#.to_string(),
        }
    }
}

/// Metric queries and the labels the aggregator groups by. `$namespace`
/// in the drilldown query is replaced with the requested tenant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueriesConfig {
    pub logs: LogQueriesConfig,
    pub instances: String,
    pub drilldown: String,
    /// Fallback drill-down source when nothing carries the service label:
    /// raw per-pod series, grouped client-side by pod-name prefix.
    pub drilldown_pods: String,
    pub current: String,
    pub pods: String,
    pub tenant_label: String,
    pub service_label: String,
    pub pod_label: String,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            logs: LogQueriesConfig::default(),
            instances: "sum by (namespace) (platform_instance_count)".to_string(),
            drilldown: r#"sum by (controller) (platform_instance_count{namespace="$namespace"})"#
                .to_string(),
            drilldown_pods: r#"max by (pod) (platform_pod_up{namespace="$namespace"})"#
                .to_string(),
            current: "sum by (namespace) (platform_instance_count)".to_string(),
            pods: "max by (namespace, pod) (platform_pod_up)".to_string(),
            tenant_label: "namespace".to_string(),
            service_label: "controller".to_string(),
            pod_label: "pod".to_string(),
        }
    }
}

/// Event-feed pagination policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Per-query line cap for one window.
    pub query_limit: u32,
    /// Backfill page width in days.
    pub page_chunk_days: i64,
    /// How far back pagination can reach, in days.
    pub max_lookback_days: i64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            query_limit: 1000,
            page_chunk_days: 3,
            max_lookback_days: 30,
        }
    }
}

/// Client-driven poll intervals, advertised on the root endpoint so the
/// dashboard keeps to the server's policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    pub events_interval_secs: u64,
    pub graph_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            events_interval_secs: 30,
            graph_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,server=debug".to_string(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    File { path: String },
}

impl AppConfig {
    /// Load configuration from server.toml and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        // Compile-time defaults are the foundation; missing keys in
        // files/env fall back to them.
        let defaults = config::Config::try_from(&AppConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        // Layer config files (overrides defaults). Tried in order:
        // 1. /etc/pulse/server.toml (production)
        // 2. config/server.toml (local development)
        // 3. crates/server/config/server.toml (workspace root)
        let config_paths = vec!["/etc/pulse/server", "config/server", "crates/server/config/server"];

        for path in config_paths {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Environment variables override everything. Double underscore for
        // nested keys: PULSE_BACKEND__LOKI_URL.
        builder = builder.add_source(
            config::Environment::with_prefix("PULSE")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        self.server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .context("Invalid bind_address")?;

        for (name, url) in [
            ("loki_url", &self.backend.loki_url),
            ("prometheus_url", &self.backend.prometheus_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }

        if self.events.page_chunk_days < 1 {
            anyhow::bail!("events.page_chunk_days must be at least 1");
        }
        if self.events.max_lookback_days < self.events.page_chunk_days {
            anyhow::bail!("events.max_lookback_days must cover at least one page chunk");
        }
        for (name, query) in [
            ("queries.drilldown", &self.queries.drilldown),
            ("queries.drilldown_pods", &self.queries.drilldown_pods),
        ] {
            if !query.contains("$namespace") {
                anyhow::bail!("{} must contain the $namespace placeholder", name);
            }
        }

        Ok(())
    }
}
