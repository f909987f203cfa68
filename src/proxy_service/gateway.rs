use std::sync::Arc;

use actix_web::body::BoxBody;
use actix_web::HttpResponse;
use bytes::Bytes;
use log::info;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};

use crate::gateway_config::{ConfigError, GatewayConfig, HttpMethod};
use crate::proxy_service::gateway_error::GatewayError;
use crate::proxy_service::header_policy::{outbound_headers, response_headers};

/// What the route layer hands over from the inbound request.
#[derive(Debug, Default, Clone)]
pub struct InboundRequest {
  pub headers: HeaderMap,
  pub query: Option<String>,
  pub body: Bytes,
}

/// Upstream response, already filtered and fully buffered.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Bytes,
}

impl ForwardedResponse {
  pub fn into_http_response(self) -> HttpResponse {
    let mut http_response = HttpResponse::new(self.status);
    let headers = http_response.headers_mut();

    for (name, value) in self.headers.iter() {
      headers.append(name.clone(), value.clone());
    }

    http_response.set_body(BoxBody::new(self.body))
  }
}

#[derive(Clone)]
pub struct Gateway {
  config: Arc<GatewayConfig>,
  credential: Option<HeaderValue>,
  http_client: Client,
}

impl Gateway {
  pub fn new(config: GatewayConfig, http_client: Client) -> Result<Gateway, ConfigError> {
    let credential = match config.api_token.as_deref() {
      Some(token) => {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
          .map_err(|_| ConfigError::InvalidToken)?;
        value.set_sensitive(true);
        Some(value)
      }
      None => None,
    };

    Ok(Gateway {
      config: Arc::new(config),
      credential,
      http_client,
    })
  }

  pub fn config(&self) -> &GatewayConfig {
    &self.config
  }

  /// Relays one inbound request to the upstream. Each call is independent: no retries,
  /// and the configured timeout covers connecting, sending and reading the whole body.
  pub async fn forward(
    &self,
    method: HttpMethod,
    segments: &[String],
    inbound: InboundRequest,
  ) -> Result<ForwardedResponse, GatewayError> {
    let InboundRequest {
      headers,
      query,
      body,
    } = inbound;

    let url = compose_url(&self.config.upstream_base, segments, query.as_deref());
    let target = Url::parse(&url).map_err(|err| GatewayError::InvalidUrl {
      url: url.clone(),
      reason: err.to_string(),
    })?;

    let headers = outbound_headers(method, headers, self.credential.as_ref());

    info!("Proxy request: {} {}", method, url);

    let mut builder = self
      .http_client
      .request(method.to_method(), target)
      .headers(headers)
      .timeout(self.config.timeout);

    if method.forwards_body() {
      builder = builder.body(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|err| self.map_send_error(err, GatewayError::Transport))?;

    let status = response.status();
    let headers = response_headers(response.headers());

    info!("Proxy response: {} {}", status.as_u16(), url);

    let body = response
      .bytes()
      .await
      .map_err(|err| self.map_send_error(err, GatewayError::ResponseBody))?;

    Ok(ForwardedResponse {
      status,
      headers,
      body,
    })
  }

  fn map_send_error<F>(&self, err: reqwest::Error, otherwise: F) -> GatewayError
  where
    F: FnOnce(reqwest::Error) -> GatewayError,
  {
    if err.is_timeout() {
      GatewayError::Timeout(self.config.timeout)
    } else {
      otherwise(err)
    }
  }
}

/// `base + "/" + segments` with no normalization. The query string, if any, is appended as is.
pub fn compose_url(base: &str, segments: &[String], query: Option<&str>) -> String {
  let mut url = format!("{}/{}", base, segments.join("/"));

  if let Some(query) = query.filter(|q| !q.is_empty()) {
    url.push('?');
    url.push_str(query);
  }

  url
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http_client::HttpClientConfig;
  use std::time::Duration;

  fn segments(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn composes_base_and_segments() {
    assert_eq!(
      compose_url("http://upstream.test", &segments(&["records", "123"]), None),
      "http://upstream.test/records/123"
    );
    assert_eq!(
      compose_url("http://upstream.test/v1", &segments(&["students"]), Some("grade=2")),
      "http://upstream.test/v1/students?grade=2"
    );
  }

  #[test]
  fn empty_segments_target_upstream_root() {
    assert_eq!(compose_url("http://upstream.test", &[], Some("")), "http://upstream.test/");
  }

  #[test]
  fn compose_url_joins_segments_verbatim() {
    assert_eq!(
      compose_url("http://upstream.test/", &segments(&["a%2Fb", "..", "c"]), None),
      "http://upstream.test//a%2Fb/../c"
    );
  }

  #[test]
  fn token_is_turned_into_bearer_credential() {
    let client = HttpClientConfig::default().to_client().unwrap();
    let config = GatewayConfig::new("http://upstream.test")
      .unwrap()
      .set_token(Some("secret"));

    let gateway = Gateway::new(config, client).unwrap();
    assert_eq!(gateway.credential.unwrap(), "Bearer secret");
  }

  #[test]
  fn token_with_newline_is_rejected() {
    let client = HttpClientConfig::default().to_client().unwrap();
    let config = GatewayConfig::new("http://upstream.test")
      .unwrap()
      .set_token(Some("sec\nret"));

    assert!(matches!(Gateway::new(config, client), Err(ConfigError::InvalidToken)));
  }

  #[actix_web::test]
  async fn unreachable_upstream_is_a_transport_error() {
    let client = HttpClientConfig::default().to_client().unwrap();
    // nothing listens on the discard port
    let config = GatewayConfig::new("http://127.0.0.1:9")
      .unwrap()
      .set_timeout(Duration::from_secs(5))
      .unwrap();
    let gateway = Gateway::new(config, client).unwrap();

    let result = gateway
      .forward(HttpMethod::Get, &segments(&["students"]), InboundRequest::default())
      .await;

    assert!(matches!(result, Err(GatewayError::Transport(_))));
  }
}
