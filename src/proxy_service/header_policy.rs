use crate::gateway_config::HttpMethod;
use reqwest::header::{
  HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_HEADERS,
  ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONNECTION,
  CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING,
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Inbound headers that never reach the upstream. The body is re-framed and the
/// client negotiates its own compression, so framing and encoding headers go too.
static STRIPPED_REQUEST_HEADERS: [HeaderName; 5] =
  [HOST, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION, ACCEPT_ENCODING];

/// Upstream headers describing framing of a body the gateway has already buffered.
pub static STRIPPED_RESPONSE_HEADERS: [HeaderName; 4] =
  [CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION];

pub fn outbound_headers(
  method: HttpMethod,
  mut headers: HeaderMap,
  credential: Option<&HeaderValue>,
) -> HeaderMap {
  for name in STRIPPED_REQUEST_HEADERS.iter() {
    headers.remove(name);
  }

  // caller identity never overrides the gateway's own credential
  if let Some(credential) = credential {
    headers.insert(AUTHORIZATION, credential.clone());
  }

  // an empty content-type counts as absent
  let content_type_missing = headers
    .get(CONTENT_TYPE)
    .map_or(true, |value| value.as_bytes().is_empty());

  if method.defaults_content_type() && content_type_missing {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
  }

  headers
}

pub fn response_headers(upstream: &HeaderMap) -> HeaderMap {
  let mut headers = HeaderMap::with_capacity(upstream.len() + 3);

  for (name, value) in upstream.iter() {
    if !STRIPPED_RESPONSE_HEADERS.contains(name) {
      headers.append(name.clone(), value.clone());
    }
  }

  apply_cors(&mut headers);
  headers
}

pub fn apply_cors(headers: &mut HeaderMap) {
  headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
  headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
  headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
}
