use actix_web::{web, Scope};

use crate::proxy_service::gateway::Gateway;
use crate::proxy_service::proxy_factory::ProxyRouteServiceFactory;

pub mod gateway;
pub mod gateway_error;
pub mod header_policy;
pub mod proxy_factory;
pub mod proxy_route_service;

/// Mounts the gateway under its configured prefix. Every method and sub-path reaches
/// the route service, which decides what is forwarded.
pub fn gateway_scope(gateway: Gateway) -> Scope {
  let prefix = match gateway.config().prefix.as_ref() {
    "/" => String::new(),
    prefix => prefix.to_string(),
  };

  web::scope(&prefix).default_service(ProxyRouteServiceFactory::create(gateway))
}
