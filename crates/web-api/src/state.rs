use std::sync::Arc;

use application::{GatewayService, RelayService};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayService>,
    pub relay: Arc<RelayService>,
}

impl AppState {
    pub fn new(gateway: Arc<GatewayService>, relay: Arc<RelayService>) -> Self {
        Self { gateway, relay }
    }
}
