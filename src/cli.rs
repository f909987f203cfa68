use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::gateway_config::{
  ConfigError, GatewayConfig, GatewayConfigFile, DEFAULT_PREFIX, DEFAULT_TIMEOUT_SECS,
};
use crate::http_client::{HttpClientConfig, DEFAULT_MAX_REDIRECTS};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WORKER_COUNT: usize = 4;
const DEFAULT_BIND: &str = "0.0.0.0";

/// Forwards `/api/proxy/...` requests to the upstream API with a server-held credential.
#[derive(Parser, Debug, Clone)]
#[command(name = "api_proxy_gateway", version, about)]
pub struct Args {
  /// Upstream base URL every proxied path is resolved against
  #[arg(long, env = "API_BASE_URL")]
  pub api_base_url: Option<String>,

  /// Bearer token injected into every upstream request
  #[arg(long, env = "API_TOKEN", hide_env_values = true)]
  pub api_token: Option<String>,

  /// Upper bound for one upstream exchange, in seconds
  #[arg(long, env = "PROXY_TIMEOUT_SECS")]
  pub timeout_secs: Option<u64>,

  /// Path prefix the gateway is mounted on
  #[arg(long, env = "PROXY_PREFIX")]
  pub prefix: Option<String>,

  #[arg(long, env = "HTTP_BIND", default_value = DEFAULT_BIND)]
  pub bind: String,

  #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_PORT)]
  pub port: u16,

  #[arg(long, env = "HTTP_WORKER_COUNT", default_value_t = DEFAULT_WORKER_COUNT)]
  pub workers: usize,

  /// Outbound HTTP or SOCKS proxy for upstream traffic
  #[arg(long, env = "HTTP_PROXY_URL")]
  pub http_proxy_url: Option<String>,

  #[arg(long, env = "HTTP_PROXY_USER")]
  pub http_proxy_user: Option<String>,

  #[arg(long, env = "HTTP_PROXY_PASS", hide_env_values = true)]
  pub http_proxy_pass: Option<String>,

  /// Optional YAML settings file; flags and environment take precedence
  #[arg(short, long, env = "GATEWAY_CONF_LOCATION")]
  pub config: Option<PathBuf>,

  #[arg(long, env = "LOG_LEVEL", default_value = "info")]
  pub log_level: String,
}

pub struct ServerConfig {
  pub bind: String,
  pub port: u16,
  pub workers: usize,
}

pub struct Settings {
  pub gateway: GatewayConfig,
  pub server: ServerConfig,
  pub http_client: HttpClientConfig,
  pub log_level: String,
}

impl Args {
  pub fn into_settings(self) -> Result<Settings, ConfigError> {
    let file_settings = match &self.config {
      Some(path) => GatewayConfigFile::load_from_file(&File::open(path)?)?,
      None => GatewayConfigFile::default(),
    };

    self.merge(file_settings)
  }

  pub fn merge(self, file_settings: GatewayConfigFile) -> Result<Settings, ConfigError> {
    let Args {
      api_base_url,
      api_token,
      timeout_secs,
      prefix,
      bind,
      port,
      workers,
      http_proxy_url,
      http_proxy_user,
      http_proxy_pass,
      log_level,
      ..
    } = self;

    let upstream = api_base_url
      .or(file_settings.api_base_url)
      .ok_or(ConfigError::MissingUpstream)?;
    let token = api_token.or(file_settings.api_token);
    let timeout_secs = timeout_secs
      .or(file_settings.timeout_secs)
      .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let prefix = prefix
      .or(file_settings.prefix)
      .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

    let gateway = GatewayConfig::new(&upstream)?
      .set_token(token.as_deref())
      .set_timeout(Duration::from_secs(timeout_secs))?
      .set_prefix(&prefix)?;

    Ok(Settings {
      gateway,
      server: ServerConfig {
        bind,
        port,
        workers: workers.max(1),
      },
      http_client: HttpClientConfig {
        http_proxy: http_proxy_url,
        user: http_proxy_user,
        pass: http_proxy_pass,
        max_redirects: DEFAULT_MAX_REDIRECTS,
      },
      log_level,
    })
  }
}
