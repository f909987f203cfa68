use reqwest::{Method, Url};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "/api/proxy";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(PartialEq, Debug, Clone, Copy, Hash, Eq)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Patch,
  Delete,
  Options,
  Head,
}

impl HttpMethod {
  /// Every verb the gateway relays upstream.
  pub const FORWARDED: [HttpMethod; 7] = [
    HttpMethod::Get,
    HttpMethod::Head,
    HttpMethod::Post,
    HttpMethod::Put,
    HttpMethod::Patch,
    HttpMethod::Delete,
    HttpMethod::Options,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Patch => "PATCH",
      HttpMethod::Delete => "DELETE",
      HttpMethod::Options => "OPTIONS",
      HttpMethod::Head => "HEAD",
    }
  }

  /// GET and HEAD never carry a request body upstream.
  pub fn forwards_body(&self) -> bool {
    !matches!(self, HttpMethod::Get | HttpMethod::Head)
  }

  /// Write methods get `content-type: application/json` when the caller sent none.
  pub fn defaults_content_type(&self) -> bool {
    matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
  }

  pub fn to_method(self) -> Method {
    match self {
      HttpMethod::Get => Method::GET,
      HttpMethod::Post => Method::POST,
      HttpMethod::Put => Method::PUT,
      HttpMethod::Patch => Method::PATCH,
      HttpMethod::Delete => Method::DELETE,
      HttpMethod::Options => Method::OPTIONS,
      HttpMethod::Head => Method::HEAD,
    }
  }
}

impl TryFrom<&str> for HttpMethod {
  type Error = ();

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    match value.to_lowercase().as_str() {
      "get" => Ok(HttpMethod::Get),
      "post" => Ok(HttpMethod::Post),
      "put" => Ok(HttpMethod::Put),
      "patch" => Ok(HttpMethod::Patch),
      "delete" => Ok(HttpMethod::Delete),
      "options" => Ok(HttpMethod::Options),
      "head" => Ok(HttpMethod::Head),
      _ => Err(()),
    }
  }
}

impl TryFrom<&Method> for HttpMethod {
  type Error = ();

  fn try_from(value: &Method) -> Result<Self, Self::Error> {
    HttpMethod::try_from(value.as_str())
  }
}

impl Display for HttpMethod {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("upstream base url is not configured (set API_BASE_URL or --api-base-url)")]
  MissingUpstream,
  #[error("invalid upstream base url '{url}': {reason}")]
  InvalidUpstream { url: String, reason: String },
  #[error("timeout must be greater than zero")]
  ZeroTimeout,
  #[error("api token contains characters not allowed in an http header")]
  InvalidToken,
  #[error("route prefix '{0}' must start with '/'")]
  InvalidPrefix(String),
  #[error("unable to read settings file: {0}")]
  Io(#[from] std::io::Error),
  #[error("unable to parse settings file: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

/// Optional YAML settings file. Every key can be overridden from the command line
/// or the environment.
#[derive(Deserialize, PartialEq, Debug, Clone, Default)]
pub struct GatewayConfigFile {
  pub api_base_url: Option<String>,
  pub api_token: Option<String>,
  pub timeout_secs: Option<u64>,
  pub prefix: Option<String>,
}

impl GatewayConfigFile {
  pub fn load_from_file(file: &File) -> Result<GatewayConfigFile, ConfigError> {
    let settings: GatewayConfigFile = serde_yaml::from_reader(file)?;
    Ok(settings)
  }

  pub fn from_yaml(content: &str) -> Result<GatewayConfigFile, ConfigError> {
    let settings: GatewayConfigFile = serde_yaml::from_str(content)?;
    Ok(settings)
  }
}

/// Immutable gateway settings, built once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
  pub upstream_base: Box<str>,
  pub api_token: Option<Box<str>>,
  pub timeout: Duration,
  pub prefix: Box<str>,
}

impl GatewayConfig {
  pub fn new(upstream_base: &str) -> Result<GatewayConfig, ConfigError> {
    validate_upstream(upstream_base)?;

    Ok(GatewayConfig {
      upstream_base: Box::from(upstream_base),
      api_token: None,
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
      prefix: Box::from(DEFAULT_PREFIX),
    })
  }

  pub fn set_token(mut self, token: Option<&str>) -> Self {
    self.api_token = token.filter(|t| !t.is_empty()).map(Box::from);
    self
  }

  pub fn set_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
    if timeout.is_zero() {
      return Err(ConfigError::ZeroTimeout);
    }

    self.timeout = timeout;
    Ok(self)
  }

  pub fn set_prefix(mut self, prefix: &str) -> Result<Self, ConfigError> {
    if !prefix.starts_with('/') {
      return Err(ConfigError::InvalidPrefix(prefix.to_string()));
    }

    // "/api/proxy/" and "/api/proxy" mount the same scope
    let trimmed = prefix.trim_end_matches('/');
    self.prefix = Box::from(if trimmed.is_empty() { "/" } else { trimmed });
    Ok(self)
  }
}

fn validate_upstream(upstream_base: &str) -> Result<(), ConfigError> {
  if upstream_base.trim().is_empty() {
    return Err(ConfigError::MissingUpstream);
  }

  let invalid = |reason: String| ConfigError::InvalidUpstream {
    url: upstream_base.to_string(),
    reason,
  };

  let url = Url::parse(upstream_base).map_err(|e| invalid(e.to_string()))?;

  match url.scheme() {
    "http" | "https" => {}
    other => return Err(invalid(format!("unsupported scheme '{}'", other))),
  }

  if url.host_str().is_none() {
    return Err(invalid("missing host".to_string()));
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn method_parsing_is_case_insensitive() {
    assert_eq!(HttpMethod::try_from("PaTcH"), Ok(HttpMethod::Patch));
    assert_eq!(HttpMethod::try_from(&Method::OPTIONS), Ok(HttpMethod::Options));
    assert_eq!(HttpMethod::try_from(&Method::HEAD), Ok(HttpMethod::Head));
    assert_eq!(HttpMethod::try_from("TRACE"), Err(()));
    assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
  }

  #[test]
  fn body_and_content_type_policy_per_method() {
    assert!(!HttpMethod::Get.forwards_body());
    assert!(!HttpMethod::Head.forwards_body());
    assert!(HttpMethod::Delete.forwards_body());
    assert!(HttpMethod::Options.forwards_body());

    let defaulted: Vec<HttpMethod> = HttpMethod::FORWARDED
      .iter()
      .copied()
      .filter(|m| m.defaults_content_type())
      .collect();
    assert_eq!(defaulted, vec![HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch]);
  }

  #[test]
  fn upstream_must_be_absolute_http_url() {
    assert!(matches!(GatewayConfig::new(""), Err(ConfigError::MissingUpstream)));
    assert!(matches!(
      GatewayConfig::new("upstream.test/api"),
      Err(ConfigError::InvalidUpstream { .. })
    ));
    assert!(matches!(
      GatewayConfig::new("ftp://upstream.test"),
      Err(ConfigError::InvalidUpstream { .. })
    ));

    let config = GatewayConfig::new("https://upstream.test/api/").unwrap();
    assert_eq!(config.upstream_base.as_ref(), "https://upstream.test/api/");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.prefix.as_ref(), "/api/proxy");
  }

  #[test]
  fn empty_token_means_no_credential() {
    let config = GatewayConfig::new("http://upstream.test").unwrap();
    assert_eq!(config.clone().set_token(Some("")).api_token, None);
    assert_eq!(
      config.set_token(Some("secret")).api_token.as_deref(),
      Some("secret")
    );
  }

  #[test]
  fn zero_timeout_and_relative_prefix_are_rejected() {
    let config = GatewayConfig::new("http://upstream.test").unwrap();
    assert!(matches!(
      config.clone().set_timeout(Duration::ZERO),
      Err(ConfigError::ZeroTimeout)
    ));
    assert!(matches!(
      config.clone().set_prefix("api/proxy"),
      Err(ConfigError::InvalidPrefix(_))
    ));
    assert_eq!(config.set_prefix("/gateway/").unwrap().prefix.as_ref(), "/gateway");
  }

  #[test]
  fn settings_file_keys_are_optional() {
    let settings = GatewayConfigFile::from_yaml(
      "api_base_url: http://upstream.test\ntimeout_secs: 5\n",
    )
    .unwrap();

    assert_eq!(settings.api_base_url.as_deref(), Some("http://upstream.test"));
    assert_eq!(settings.timeout_secs, Some(5));
    assert_eq!(settings.api_token, None);
    assert_eq!(settings.prefix, None);
  }
}
