use std::collections::BTreeMap;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::json;

use api_proxy_gateway::gateway_config::GatewayConfig;
use api_proxy_gateway::http_client::HttpClientConfig;
use api_proxy_gateway::proxy_service::gateway::Gateway;

/// Echoes the request it received as JSON so tests can inspect what the gateway sent.
async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
  let headers: BTreeMap<String, String> = req
    .headers()
    .iter()
    .map(|(name, value)| {
      (
        name.as_str().to_string(),
        value.to_str().unwrap_or_default().to_string(),
      )
    })
    .collect();

  // HEAD responses lose their body, so the essentials are mirrored in headers too
  HttpResponse::Ok()
    .insert_header(("x-echo-method", req.method().as_str()))
    .insert_header(("x-echo-body-len", body.len().to_string()))
    .json(json!({
    "method": req.method().as_str(),
    "uri": req.uri().to_string(),
    "headers": headers,
    "body": String::from_utf8_lossy(&body),
  }))
}

async fn students() -> HttpResponse {
  HttpResponse::Ok()
    .insert_header(("access-control-allow-origin", "https://other.test"))
    .insert_header(("x-upstream", "stub"))
    .content_type("application/json")
    .body(r#"{"id":1}"#)
}

async fn missing() -> HttpResponse {
  HttpResponse::NotFound()
    .content_type("application/json")
    .body(r#"{"error":"student not found"}"#)
}

/// Plain text large enough for the compression middleware to kick in.
pub fn report_text() -> String {
  "attendance,present,absent,late\n".repeat(128)
}

async fn report() -> HttpResponse {
  HttpResponse::Ok()
    .content_type("text/plain; charset=utf-8")
    .body(report_text())
}

async fn never_answers() -> HttpResponse {
  actix_web::rt::time::sleep(Duration::from_secs(120)).await;
  HttpResponse::Ok().body("too late")
}

/// Starts the stub upstream on an ephemeral port and returns its base URL.
pub fn start_upstream() -> String {
  let server = HttpServer::new(|| {
    App::new()
      .route("/students", web::get().to(students))
      .route("/missing", web::get().to(missing))
      .route("/slow", web::get().to(never_answers))
      .service(
        web::scope("/compressed")
          .wrap(middleware::Compress::default())
          .default_service(web::to(report)),
      )
      .default_service(web::to(echo))
  })
  .workers(1)
  .disable_signals()
  .bind(("127.0.0.1", 0))
  .expect("bind stub upstream");

  let addr = server.addrs()[0];
  actix_web::rt::spawn(server.run());

  format!("http://{}", addr)
}

pub fn gateway(base: &str, token: Option<&str>, timeout: Duration) -> Gateway {
  let config = GatewayConfig::new(base)
    .expect("valid upstream")
    .set_token(token)
    .set_timeout(timeout)
    .expect("non-zero timeout");
  let client = HttpClientConfig::default().to_client().expect("http client");

  Gateway::new(config, client).expect("gateway")
}
