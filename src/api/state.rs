//! Application state for the exeat engine API.

use std::sync::Arc;

use crate::admin::AdminCommandHandler;
use crate::config::ConfigLoader;
use crate::eligibility::EligibilityEngine;
use crate::notify::{LogNotifier, Notifier};
use crate::store::{InMemoryPolicyStore, PolicyStore};

/// Shared application state.
///
/// The engine, the command handler and the departure endpoints all share
/// one policy store.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<EligibilityEngine>,
    admin: Arc<AdminCommandHandler>,
    store: Arc<dyn PolicyStore>,
}

impl AppState {
    /// Creates state over an existing store and notifier.
    pub fn new(store: Arc<dyn PolicyStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            engine: Arc::new(EligibilityEngine::new(store.clone(), notifier)),
            admin: Arc::new(AdminCommandHandler::new(store.clone())),
            store,
        }
    }

    /// In-memory store seeded from configuration, notices to the log.
    pub fn from_config(config: &ConfigLoader) -> Self {
        Self::new(
            Arc::new(InMemoryPolicyStore::from_config(config)),
            Arc::new(LogNotifier),
        )
    }

    /// The eligibility engine.
    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    /// The administrator command handler.
    pub fn admin(&self) -> &AdminCommandHandler {
        &self.admin
    }

    /// The shared policy store.
    pub fn store(&self) -> &dyn PolicyStore {
        self.store.as_ref()
    }
}
