pub mod api;

use crate::agent::RelayAgent;
use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use log::{ info, warn };

pub struct Server {
    addr: String,
    agent: Arc<RelayAgent>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, agent: Arc<RelayAgent>, args: Args) -> Self {
        Self { addr, agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid listen address '{}': {}", self.addr, e))?;

        if self.args.requests_per_second == 0 {
            warn!("Request rate limiting disabled.");
        } else {
            info!("Request rate limit: {} requests/second", self.args.requests_per_second);
        }

        let state = api::AppState::new(Arc::clone(&self.agent), self.args.requests_per_second);
        api::start_http_server(addr, state, &self.args).await
    }
}
