use std::sync::Arc;

use crate::{
    cart::CartManager, config::AppConfig, gateway::Gateway, storage::ObjectStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub carts: Arc<CartManager<dyn Gateway>>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        storage: Arc<dyn ObjectStorage>,
        config: AppConfig,
    ) -> Self {
        let carts = CartManager::new(gateway.clone()).with_policy(config.checkout_policy);
        Self {
            gateway,
            carts: Arc::new(carts),
            storage,
            config: Arc::new(config),
        }
    }
}
