//! The entry point request handlers hold on to.
//!
//! [`LayerGroupEngine`] bundles the collaborators, configuration and
//! per-project locks. Its operations are implemented in
//! [`crate::shakeup`] and [`crate::lgset`].

use std::sync::Arc;

use crate::config::StackupConfig;
use crate::locks::ProjectLocks;
use crate::services::{ConstraintService, LayoutRepository, LinkageService};

pub struct LayerGroupEngine {
    pub(crate) repo: Arc<dyn LayoutRepository>,
    pub(crate) constraints: Arc<dyn ConstraintService>,
    pub(crate) linkage: Arc<dyn LinkageService>,
    pub(crate) config: StackupConfig,
    pub(crate) locks: ProjectLocks,
}

impl LayerGroupEngine {
    pub fn new(
        repo: Arc<dyn LayoutRepository>,
        constraints: Arc<dyn ConstraintService>,
        linkage: Arc<dyn LinkageService>,
        config: StackupConfig,
    ) -> Self {
        Self {
            repo,
            constraints,
            linkage,
            config,
            locks: ProjectLocks::new(),
        }
    }

    /// Build an engine whose collaborators are all the same object.
    pub fn with_store<S>(store: Arc<S>, config: StackupConfig) -> Self
    where
        S: LayoutRepository + ConstraintService + LinkageService + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn locks(&self) -> &ProjectLocks {
        &self.locks
    }
}

impl std::fmt::Debug for LayerGroupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerGroupEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
