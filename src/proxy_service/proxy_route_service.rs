use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse};
use actix_web::http::header::{ALLOW, ACCESS_CONTROL_ALLOW_ORIGIN};
use actix_web::{dev, HttpRequest, HttpResponse, ResponseError};
use bytes::{Bytes, BytesMut};
use futures_core::future::LocalBoxFuture;
use futures_core::Stream;
use futures_util::StreamExt;
use log::{debug, error, warn};
use reqwest::header::HeaderMap;

use crate::gateway_config::HttpMethod;
use crate::proxy_service::gateway::{Gateway, InboundRequest};
use crate::proxy_service::gateway_error::GatewayError;
use crate::proxy_service::header_policy::ALLOW_ORIGIN;

const ALLOW_VERBS: &str = "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS";

pub struct ProxyRouteService {
  pub(super) gateway: Gateway,
}

impl Service<ServiceRequest> for ProxyRouteService {
  type Response = ServiceResponse;
  type Error = actix_web::Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  dev::always_ready!();

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let (http_request, payload) = req.into_parts();
    let gateway = self.gateway.clone();

    Box::pin(async move { Ok(ProxyRouteService::exec(gateway, http_request, payload).await) })
  }
}

impl ProxyRouteService {
  async fn exec(gateway: Gateway, http: HttpRequest, payload: Payload) -> ServiceResponse {
    let method = match HttpMethod::try_from(http.method()) {
      Ok(method) => method,
      Err(()) => {
        warn!("Rejected {} {}", http.method(), http.path());
        let response = HttpResponse::MethodNotAllowed()
          .insert_header((ALLOW, ALLOW_VERBS))
          .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN))
          .finish();
        return ServiceResponse::new(http, response);
      }
    };

    let segments = split_segments(&gateway.config().prefix, http.path());

    let body = if method.forwards_body() {
      match read_payload(payload).await {
        Ok(bytes) => bytes,
        Err(err) => {
          error!("Reading request body failed {}", err);
          return ServiceResponse::new(http, err.error_response());
        }
      }
    } else {
      Bytes::new()
    };

    let inbound = InboundRequest {
      headers: inbound_headers(&http),
      query: Some(http.query_string())
        .filter(|q| !q.is_empty())
        .map(String::from),
      body,
    };

    let response = match gateway.forward(method, &segments, inbound).await {
      Ok(forwarded) => forwarded.into_http_response(),
      Err(err) => {
        error!("Proxy request failed {}", err);
        err.error_response()
      }
    };

    debug!("Proxy status {} for {}", response.status(), http.path());

    ServiceResponse::new(http, response)
  }
}

async fn read_payload(mut payload: Payload) -> Result<Bytes, GatewayError> {
  let (size, _) = payload.size_hint();
  let mut body_buffer = BytesMut::with_capacity(size);

  while let Some(chunk) = payload.next().await {
    body_buffer.extend_from_slice(&chunk?);
  }

  Ok(body_buffer.freeze())
}

fn inbound_headers(http: &HttpRequest) -> HeaderMap {
  let mut headers = HeaderMap::with_capacity(http.headers().len());

  for (name, value) in http.headers().iter() {
    headers.append(name.clone(), value.clone());
  }

  headers
}

/// Raw (still percent-encoded) path segments after the mount prefix.
pub fn split_segments(prefix: &str, path: &str) -> Vec<String> {
  let rest = path.strip_prefix(prefix).unwrap_or(path);
  let rest = rest.strip_prefix('/').unwrap_or(rest);

  if rest.is_empty() {
    return Vec::new();
  }

  rest.split('/').map(String::from).collect()
}
