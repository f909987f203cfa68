use std::io::{Error, ErrorKind, Result};

use actix_web::{App, HttpServer};
use clap::Parser;
use log::info;

use api_proxy_gateway::cli::Args;
use api_proxy_gateway::proxy_service::gateway::Gateway;
use api_proxy_gateway::proxy_service::gateway_scope;
use api_proxy_gateway::std_logger::StdLogger;

#[actix_web::main]
async fn main() -> Result<()> {
  let settings = Args::parse()
    .into_settings()
    .map_err(|err| Error::new(ErrorKind::Other, err))?;

  StdLogger::init(&settings.log_level).map_err(|err| Error::new(ErrorKind::Other, err))?;

  let http_client = settings
    .http_client
    .to_client()
    .map_err(|err| Error::new(ErrorKind::Other, err))?;

  let gateway =
    Gateway::new(settings.gateway, http_client).map_err(|err| Error::new(ErrorKind::Other, err))?;

  let server = settings.server;
  info!(
    "Forwarding '{}' to '{}' (timeout {:?}, credential {}).",
    gateway.config().prefix,
    gateway.config().upstream_base,
    gateway.config().timeout,
    if gateway.config().api_token.is_some() { "configured" } else { "not configured" }
  );
  info!("Listening on {}:{} with {} workers.", server.bind, server.port, server.workers);

  HttpServer::new(move || App::new().service(gateway_scope(gateway.clone())))
    .workers(server.workers)
    .bind((server.bind, server.port))?
    .run()
    .await
}
