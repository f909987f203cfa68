use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use futures_core::future::LocalBoxFuture;

use crate::proxy_service::gateway::Gateway;
use crate::proxy_service::proxy_route_service::ProxyRouteService;

pub struct ProxyRouteServiceFactory {
  pub gateway: Gateway,
}

impl ServiceFactory<ServiceRequest> for ProxyRouteServiceFactory {
  type Response = ServiceResponse;
  type Error = actix_web::Error;
  type Config = ();
  type Service = ProxyRouteService;
  type InitError = ();
  type Future = LocalBoxFuture<'static, Result<Self::Service, Self::InitError>>;

  fn new_service(&self, _: Self::Config) -> Self::Future {
    let service = ProxyRouteService {
      gateway: self.gateway.clone(),
    };

    Box::pin(async move { Ok(service) })
  }
}

impl ProxyRouteServiceFactory {
  pub fn create(gateway: Gateway) -> Self {
    Self { gateway }
  }
}
