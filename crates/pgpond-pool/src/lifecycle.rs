//! Process-lifecycle entry points
//!
//! Pools are registered at configuration time, but their engines belong to
//! the serving process: the host calls [`initialize_engines`] from its
//! worker-process-started event and [`teardown_engines`] (or
//! [`ProcessPoolState::teardown`]) from its shutdown event. The state
//! object is explicit; there is no process-global singleton.

use std::sync::Arc;

use pgpond_core::{ConnectionFactory, Result};

use crate::engine::ResourceList;
use crate::pool::PoolSettings;
use crate::registry::PoolRegistry;


/// Builds a backend-specific connection factory from pool settings.
///
/// This is the seam between the backend crate and this one: the host hands
/// a provider to [`initialize_engines`], which asks it for one factory per
/// qualifying pool.
pub trait FactoryProvider: Send + Sync {
    /// Build a factory for one pool's settings
    fn factory_for(&self, settings: &PoolSettings) -> Result<Arc<dyn ConnectionFactory>>;
}

/// The per-process engine state created by [`initialize_engines`].
///
/// Holds the scopes whose pools received engines. Dropping it without
/// calling [`teardown`](Self::teardown) leaves engine shutdown to the
/// connections' own drop handlers; orderly hosts tear down explicitly.
pub struct ProcessPoolState {
    scopes: Vec<Arc<PoolRegistry>>,
}

impl ProcessPoolState {
    /// Scopes managed by this state object
    pub fn scopes(&self) -> &[Arc<PoolRegistry>] {
        &self.scopes
    }

    /// Shut down every engine this process installed and clear the pools'
    /// engine slots. Connections still held by callers are force-destroyed.
    #[tracing::instrument(skip(self))]
    pub async fn teardown(self) {
        for registry in &self.scopes {
            for pool in registry.pools() {
                if let Some(engine) = pool.take_engine() {
                    tracing::debug!(pool = %pool.name(), "shutting down pool engine");
                    engine.shutdown().await;
                }
            }
        }
        tracing::info!("pool engines torn down");
    }
}

/// Create an engine for every qualifying pool in every scope.
///
/// Called once per serving process, after configuration is finalized and
/// before any request is handled. Pools with a hard maximum of 0 are
/// skipped by design and keep reporting `Unavailable`; a pool whose
/// factory cannot be built is logged and left engine-less rather than
/// failing the process.
#[tracing::instrument(skip(scopes, provider))]
pub async fn initialize_engines(
    scopes: &[Arc<PoolRegistry>],
    provider: &dyn FactoryProvider,
) -> ProcessPoolState {
    for registry in scopes {
        for pool in registry.pools() {
            let settings = pool.settings();
            if settings.pool_max_hard() == 0 {
                tracing::debug!(pool = %pool.name(), "pooling disabled, no engine created");
                continue;
            }
            match provider.factory_for(settings) {
                Ok(factory) => {
                    let engine = ResourceList::new(
                        settings.pool_min(),
                        settings.pool_max_soft(),
                        settings.pool_max_hard(),
                        settings.pool_ttl(),
                        factory,
                    )
                    .await;
                    pool.install_engine(Arc::new(engine));
                    tracing::info!(
                        pool = %pool.name(),
                        min = settings.pool_min(),
                        max_soft = settings.pool_max_soft(),
                        max_hard = settings.pool_max_hard(),
                        "pool engine created"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        pool = %pool.name(),
                        error = %e,
                        "failed to create pool engine; pool will report unavailable"
                    );
                }
            }
        }
    }
    ProcessPoolState {
        scopes: scopes.to_vec(),
    }
}

/// Tear down the engines created by [`initialize_engines`].
///
/// Free-function alias for hosts that wire lifecycle events to plain
/// functions.
pub async fn teardown_engines(state: ProcessPoolState) {
    state.teardown().await
}
