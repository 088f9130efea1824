//! Substrate registry and factory.

use std::sync::Arc;

use crate::domain::models::SubstrateConfig;
use crate::domain::ports::{Substrate, SubstrateFactory, WorkExecutor};

use super::local::LocalSubstrate;

/// Opens substrate sessions from configuration.
#[derive(Debug, Clone, Default)]
pub struct SubstrateRegistry {
    config: SubstrateConfig,
}

impl SubstrateRegistry {
    /// A registry for the configured backend.
    pub const fn new(config: SubstrateConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &SubstrateConfig {
        &self.config
    }

    /// Create an in-process substrate session.
    pub fn local(&self, executor: Arc<dyn WorkExecutor>) -> LocalSubstrate {
        LocalSubstrate::new(executor, self.config.max_workers)
    }
}

impl SubstrateFactory for SubstrateRegistry {
    fn create(&self, executor: Arc<dyn WorkExecutor>) -> Arc<dyn Substrate> {
        Arc::new(self.local(executor))
    }
}
