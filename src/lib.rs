pub mod cli;
pub mod gateway_config;
pub mod http_client;
pub mod proxy_service;
pub mod std_logger;
