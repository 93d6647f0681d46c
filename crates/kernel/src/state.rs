//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use jsonwebtoken::DecodingKey;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::filter::FilterRegistry;
use crate::query::{PgStore, Store};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Entity store every request reads through.
    store: Arc<dyn Store>,

    /// Filter sets, validated once at startup.
    filters: FilterRegistry,

    /// Bearer token verification key.
    jwt_key: DecodingKey,
}

impl AppState {
    /// Connect to PostgreSQL and build the filter registry.
    ///
    /// Fails if any filter set is inconsistently declared.
    pub async fn new(config: &Config) -> Result<Self> {
        let filters = FilterRegistry::build().context("invalid filter set declaration")?;

        let pool = db::create_pool(config).await?;
        info!(
            max_connections = config.database_max_connections,
            "PostgreSQL pool created"
        );

        Ok(Self::with_store(
            Arc::new(PgStore::new(pool)),
            filters,
            &config.jwt_secret,
        ))
    }

    /// State over an arbitrary store.
    pub fn with_store(store: Arc<dyn Store>, filters: FilterRegistry, jwt_secret: &str) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                filters,
                jwt_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            }),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.inner.filters
    }

    pub fn jwt_key(&self) -> &DecodingKey {
        &self.inner.jwt_key
    }

    pub async fn store_healthy(&self) -> bool {
        self.inner.store.healthy().await
    }
}
