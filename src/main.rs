#[macro_use]
extern crate log;

use std::sync::Arc;
use thiserror::Error;

mod config;
mod event;
mod kube;
mod policy;
mod reconcile;
mod request;
mod server;

#[derive(Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Failed to connect to Kubernetes: {0}")]
    Kube(#[from] ::kube::Error),
    #[error("Failed to serve plugin requests: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = Arc::new(config::Config::from_env()?);

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();

    info!(
        "Starting instance `{}`, managing ingresses in namespace `{}`.",
        config.instance, config.namespace
    );

    let store = crate::kube::Kube::connect().await?;
    let handler = Arc::new(request::Handler::new(config.clone(), store));

    server::start(config.listen_addr(), handler).await?;

    Ok(())
}
