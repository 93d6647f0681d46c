//! Store backends executing querysets.
//!
//! Provides the trait consumed by filter sets, the paginator and the
//! serializers, plus the PostgreSQL implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::debug;

use crate::models::Model;

use super::predicate::Predicate;
use super::query_builder::QuerySetBuilder;
use super::queryset::{Entity, QuerySet, Slice};

/// Read access to persisted collections.
#[async_trait]
pub trait Store: Send + Sync {
    /// Number of rows matching the queryset, ignoring any window.
    async fn count(&self, queryset: &QuerySet) -> Result<u64>;

    /// Rows matching the queryset in its ordering, with annotations attached.
    async fn fetch(&self, queryset: &QuerySet, slice: Option<Slice>) -> Result<Vec<Entity>>;

    /// Whether the backend can serve queries.
    async fn healthy(&self) -> bool;

    /// First row in queryset order.
    async fn first(&self, queryset: &QuerySet) -> Result<Option<Entity>> {
        let mut rows = self
            .fetch(queryset, Some(Slice { offset: 0, limit: 1 }))
            .await?;
        Ok(rows.pop())
    }

    async fn exists(&self, queryset: &QuerySet) -> Result<bool> {
        Ok(self.first(queryset).await?.is_some())
    }

    async fn fetch_all(&self, queryset: &QuerySet) -> Result<Vec<Entity>> {
        self.fetch(queryset, None).await
    }

    /// Look up one row by primary key.
    async fn get(&self, model: Model, id: i64) -> Result<Option<Entity>> {
        self.first(&QuerySet::new(model).filter(Predicate::eq("id", id)))
            .await
    }
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn count(&self, queryset: &QuerySet) -> Result<u64> {
        let sql = QuerySetBuilder::new(queryset).build_count();
        debug!(sql = %sql, "count query");
        let total: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .context("failed to execute count query")?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch(&self, queryset: &QuerySet, slice: Option<Slice>) -> Result<Vec<Entity>> {
        let sql = QuerySetBuilder::new(queryset).build_json(slice);
        debug!(sql = %sql, "fetch query");
        let rows: Vec<JsonValue> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to execute fetch query")?;

        let names = queryset.annotation_names();
        rows.into_iter()
            .map(|row| split_row(queryset.model(), row, &names))
            .collect()
    }

    async fn healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Turn one `row_to_json` object into an entity, moving annotation columns
/// out of the intrinsic fields.
pub(crate) fn split_row(model: Model, row: JsonValue, annotations: &[String]) -> Result<Entity> {
    let JsonValue::Object(mut fields) = row else {
        anyhow::bail!("{} row is not a JSON object", model.table());
    };
    let mut values = serde_json::Map::new();
    for name in annotations {
        let value = fields.remove(name).unwrap_or(JsonValue::Null);
        values.insert(name.clone(), value);
    }
    let mut entity = Entity::from_row(model, fields)
        .with_context(|| format!("{} row has no integer id", model.table()))?;
    entity.annotations = values;
    Ok(entity)
}
