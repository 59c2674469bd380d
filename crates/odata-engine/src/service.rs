//! Orchestrates the v4 execution order (spec §4.8):
//! `Parsed → Validated → Built → Executed → Scanned → Computed → Expanded →
//! Projected → Responded`. Cancellation is checked at every boundary.

use crate::expand::{expand_rows, ExpandContext};
use crate::keys::{key_filter_tree, parse_key_segment};
use odata_core::{EntityMetadata, Error, MetadataRegistry, ODataResponse, OrderedEntity, Result};
use odata_dialect::Dialect;
use odata_lang::query::{parse_query_options, QueryOptions};
use odata_lang::{semantic, Limits};
use odata_storage::DatabaseProvider;
use tokio_util::sync::CancellationToken;

/// Ties a metadata registry, a live provider, and the configured limits
/// together into the one entry point the server layer calls per request.
pub struct EntityService<'a> {
    pub registry: &'a MetadataRegistry,
    pub provider: &'a dyn DatabaseProvider,
    pub limits: Limits,
}

impl<'a> EntityService<'a> {
    pub fn new(registry: &'a MetadataRegistry, provider: &'a dyn DatabaseProvider) -> Self {
        Self { registry, provider, limits: Limits::default() }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    fn resolve_entity(&self, entity_set: &str) -> Result<&EntityMetadata> {
        self.registry
            .get(entity_set)
            .ok_or_else(|| Error::not_found(entity_set, "<entity set>"))
    }

    /// `GET /<EntitySet>?...` — builds, executes, and assembles a collection
    /// response, running the full pipeline through `$expand` and `$select`.
    pub async fn query_collection(&self, entity_set: &str, raw_query: &str, cancel: &CancellationToken) -> Result<ODataResponse> {
        let entity = self.resolve_entity(entity_set)?;
        tracing::debug!(entity_set, "state=Parsed");

        let options = parse_query_options(raw_query, &self.limits)?;
        semantic::analyze(entity, self.registry, &options).map_err(|mut errors| errors.remove(0))?;
        tracing::debug!(entity_set, "state=Validated");
        odata_storage::check_cancelled(cancel)?;

        let (mut rows, count) = self.scan(entity, &options, cancel).await?;
        tracing::debug!(entity_set, rows = rows.len(), "state=Scanned");

        // $compute is already projected by odata-sql's SELECT list; this
        // stage is a no-op here (spec §4.8 step 3 applies only when a
        // dialect could not push the computation into SQL).
        tracing::debug!(entity_set, "state=Computed");

        odata_storage::check_cancelled(cancel)?;
        let mut ctx = ExpandContext::new(self.limits.max_expand_depth);
        expand_rows(&mut rows, entity, self.registry, self.provider, self.provider.dialect(), &options.expand, 1, &mut ctx, cancel).await?;
        tracing::debug!(entity_set, "state=Expanded");

        // $select was already applied in the SQL projection; re-pruning here
        // would be idempotent, so this step only needs to run when a future
        // in-memory-only backend cannot push $select into SQL.
        tracing::debug!(entity_set, "state=Projected");

        let mut response = ODataResponse::collection(entity_set, rows);
        if let Some(total) = count {
            response = response.with_count(total);
        }
        tracing::debug!(entity_set, "state=Responded");
        Ok(response)
    }

    /// `GET /<EntitySet>(<key>)[?$expand=...]`.
    pub async fn get_by_key(&self, entity_set: &str, raw_key: &str, raw_query: &str, cancel: &CancellationToken) -> Result<ODataResponse> {
        let entity = self.resolve_entity(entity_set)?;
        let keys = parse_key_segment(entity, raw_key)?;
        let mut options = if raw_query.is_empty() {
            QueryOptions::default()
        } else {
            parse_query_options(raw_query, &self.limits)?
        };
        semantic::analyze(entity, self.registry, &options).map_err(|mut errors| errors.remove(0))?;
        options.filter = Some(key_filter_tree(entity, &keys)?);
        options.top = Some(1);
        options.skip = None;

        let dialect = self.provider.dialect();
        let built = odata_sql::build_select(entity, dialect, &options)?;
        odata_storage::check_cancelled(cancel)?;
        let mut rows = self.provider.fetch_rows(&built, cancel).await?;

        let mut ctx = ExpandContext::new(self.limits.max_expand_depth);
        expand_rows(&mut rows, entity, self.registry, self.provider, dialect, &options.expand, 1, &mut ctx, cancel).await?;

        let row = rows.into_iter().next().ok_or_else(|| Error::not_found(entity_set, raw_key))?;
        Ok(ODataResponse::single(entity_set, row))
    }

    async fn scan(&self, entity: &EntityMetadata, options: &QueryOptions, cancel: &CancellationToken) -> Result<(Vec<OrderedEntity>, Option<i64>)> {
        let dialect = self.provider.dialect();
        let built = odata_sql::build_select(entity, dialect, options)?;
        odata_storage::check_cancelled(cancel)?;
        let rows = self.provider.fetch_rows(&built, cancel).await?;

        let count = if options.count {
            let count_query = odata_sql::build_count(entity, dialect, options)?;
            odata_storage::check_cancelled(cancel)?;
            Some(self.provider.fetch_count(&count_query, cancel).await?)
        } else {
            None
        };
        Ok((rows, count))
    }

    /// `POST /<EntitySet>`.
    pub async fn insert(&self, entity_set: &str, data: &OrderedEntity, cancel: &CancellationToken) -> Result<OrderedEntity> {
        let entity = self.resolve_entity(entity_set)?;
        let dialect = self.provider.dialect();
        let built = odata_sql::build_insert(entity, dialect, data)?;
        odata_storage::check_cancelled(cancel)?;
        self.provider.execute(&built, cancel).await?;

        let keys = data.clone();
        let key_filter = key_filter_tree(entity, &keys)?;
        let options = QueryOptions { filter: Some(key_filter), top: Some(1), ..QueryOptions::default() };
        let built = odata_sql::build_select(entity, dialect, &options)?;
        let rows = self.provider.fetch_rows(&built, cancel).await?;
        rows.into_iter().next().ok_or_else(|| Error::Execution("insert succeeded but row could not be re-fetched".into()))
    }

    /// `PATCH|PUT /<EntitySet>(<key>)`.
    pub async fn update(&self, entity_set: &str, raw_key: &str, data: &OrderedEntity, cancel: &CancellationToken) -> Result<OrderedEntity> {
        let entity = self.resolve_entity(entity_set)?;
        let keys = parse_key_segment(entity, raw_key)?;
        let dialect = self.provider.dialect();
        let built = odata_sql::build_update(entity, dialect, data, &keys)?;
        odata_storage::check_cancelled(cancel)?;
        let affected = self.provider.execute(&built, cancel).await?;
        if affected == 0 {
            return Err(Error::not_found(entity_set, raw_key));
        }

        let options = QueryOptions { filter: Some(key_filter_tree(entity, &keys)?), top: Some(1), ..QueryOptions::default() };
        let built = odata_sql::build_select(entity, dialect, &options)?;
        let rows = self.provider.fetch_rows(&built, cancel).await?;
        rows.into_iter().next().ok_or_else(|| Error::not_found(entity_set, raw_key))
    }

    /// `DELETE /<EntitySet>(<key>)`.
    pub async fn delete(&self, entity_set: &str, raw_key: &str, cancel: &CancellationToken) -> Result<()> {
        let entity = self.resolve_entity(entity_set)?;
        let keys = parse_key_segment(entity, raw_key)?;
        let built = odata_sql::build_delete(entity, self.provider.dialect(), &keys)?;
        odata_storage::check_cancelled(cancel)?;
        let affected = self.provider.execute(&built, cancel).await?;
        if affected == 0 {
            return Err(Error::not_found(entity_set, raw_key));
        }
        Ok(())
    }
}
