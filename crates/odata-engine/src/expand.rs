//! Recursive `$expand` resolution (spec §4.9), grounded in the teacher's
//! `IncludeContext` cycle/depth bookkeeping: a visited-set keyed by
//! `(entity, key)` plus a bounded depth counter, so a navigation cycle
//! terminates on the depth limit rather than looping forever.

use crate::eval::eval_predicate;
use crate::keys::key_filter_tree;
use odata_core::{EntityMetadata, Error, MetadataRegistry, OrderedEntity, Relationship, Result};
use odata_dialect::Dialect;
use odata_lang::options::ExpandOption;
use odata_lang::query::QueryOptions;
use odata_lang::ParseNode;
use odata_storage::DatabaseProvider;
use serde_json::Value;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

type ResourceKey = (String, String);

/// Tracks expand recursion depth and cycle state across one request.
#[derive(Debug)]
pub struct ExpandContext {
    visited: HashSet<ResourceKey>,
    max_depth: usize,
}

impl ExpandContext {
    pub fn new(max_depth: usize) -> Self {
        Self { visited: HashSet::new(), max_depth }
    }

    /// Marks `(entity, key)` visited; returns `false` if already seen,
    /// signalling a navigation cycle.
    pub fn mark_visited(&mut self, entity: &str, key: &str) -> bool {
        self.visited.insert((entity.to_ascii_lowercase(), key.to_string()))
    }

    pub fn depth_exceeded(&self, depth: usize) -> bool {
        depth > self.max_depth
    }
}

fn row_key(entity: &EntityMetadata, row: &OrderedEntity) -> String {
    entity
        .key_properties()
        .map(|p| row.get(&p.name).cloned().unwrap_or(Value::Null).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn inner_options(expand: &ExpandOption) -> QueryOptions {
    QueryOptions {
        filter: expand.filter.clone(),
        filter_raw: None,
        select: expand.select.clone(),
        order_by: expand.order_by.clone(),
        skip: expand.skip,
        top: expand.top,
        count: expand.count,
        expand: expand.expand.clone(),
        compute: Vec::new(),
        search: None,
    }
}

fn relationship_filter(relationship: &Relationship, local_value: &Value) -> Result<ParseNode> {
    use odata_core::{SemanticValue, Token};
    use odata_lang::kinds;

    let literal = match local_value {
        Value::Null => ParseNode::leaf(Token::new(kinds::NULL, "null")),
        Value::String(s) => ParseNode::leaf(Token::new(kinds::STRING, s.clone())),
        Value::Bool(b) => ParseNode::leaf(Token::new(kinds::BOOL, b.to_string())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ParseNode::leaf(Token::new(kinds::NUMBER, i.to_string()).with_semantic(SemanticValue::Int64(i)))
            } else if let Some(f) = n.as_f64() {
                ParseNode::leaf(Token::new(kinds::NUMBER, f.to_string()).with_semantic(SemanticValue::Float64(f)))
            } else {
                return Err(Error::build("unrepresentable numeric key value"));
            }
        }
        other => return Err(Error::build(format!("unsupported key value {other}"))),
    };
    let ident = ParseNode::leaf(Token::new(kinds::IDENT, relationship.referenced_property.clone()));
    Ok(ParseNode::new(Token::new(kinds::EQ, "eq"), vec![ident, literal]))
}

/// Applies every `$expand` in `options` to every row in `rows`, mutating
/// each `OrderedEntity` in place by inserting the resolved navigation
/// property (an array for 1:N, a single object or `null` for N:1).
pub async fn expand_rows(
    rows: &mut [OrderedEntity],
    entity: &EntityMetadata,
    registry: &MetadataRegistry,
    provider: &dyn DatabaseProvider,
    dialect: &dyn Dialect,
    expands: &[ExpandOption],
    depth: usize,
    ctx: &mut ExpandContext,
    cancel: &CancellationToken,
) -> Result<()> {
    if expands.is_empty() {
        return Ok(());
    }
    if ctx.depth_exceeded(depth) {
        return Err(Error::LimitExceeded("expand depth exceeded".into()));
    }
    odata_storage::check_cancelled(cancel)?;

    for expand in expands {
        let property = entity
            .find_property(&expand.property)
            .filter(|p| p.is_navigation)
            .ok_or_else(|| Error::semantic(format!("navigation property '{}' not found", expand.property)))?;
        let related_type = property
            .related_type
            .as_deref()
            .ok_or_else(|| Error::semantic(format!("'{}' has no related type", property.name)))?;
        let related_entity = registry
            .get(related_type)
            .ok_or_else(|| Error::semantic(format!("related entity '{related_type}' not found in metadata registry")))?;
        let relationship = property
            .relationship
            .as_ref()
            .ok_or_else(|| Error::semantic(format!("'{}' has no relationship mapping", property.name)))?;

        for row in rows.iter_mut() {
            odata_storage::check_cancelled(cancel)?;
            let key = row_key(entity, row);
            if !ctx.mark_visited(&entity.name, &key) {
                continue;
            }

            let local_value = row.get(&relationship.local_property).cloned().unwrap_or(Value::Null);

            if property.is_collection {
                let mut inner = inner_options(expand);
                let rel_filter = relationship_filter(relationship, &local_value)?;
                inner.filter = Some(match inner.filter.take() {
                    Some(existing) => {
                        ParseNode::new(odata_core::Token::new(odata_lang::kinds::AND, "and"), vec![rel_filter, existing])
                    }
                    None => rel_filter,
                });

                let built = odata_sql::build_select(related_entity, dialect, &inner)?;
                let mut related_rows = provider.fetch_rows(&built, cancel).await?;
                expand_rows_boxed(&mut related_rows, related_entity, registry, provider, dialect, &expand.expand, depth + 1, ctx, cancel)
                    .await?;
                row.insert(property.name.clone(), serde_json::to_value(&related_rows).unwrap_or(Value::Array(vec![])));
            } else {
                if local_value.is_null() {
                    row.insert(property.name.clone(), Value::Null);
                    continue;
                }
                // Spec §4.9: N:1 filters the related row by its primary key,
                // named by `relationship.referenced_property`.
                let key_filter = relationship_filter(relationship, &local_value)?;
                let lookup = QueryOptions { filter: Some(key_filter), top: Some(1), ..QueryOptions::default() };
                let built = odata_sql::build_select(related_entity, dialect, &lookup)?;
                let mut candidate_rows = provider.fetch_rows(&built, cancel).await?;

                let value = match candidate_rows.first() {
                    None => Value::Null,
                    Some(candidate) => {
                        let passes = match &expand.filter {
                            Some(tree) => eval_predicate(tree, candidate, related_entity)?,
                            None => true,
                        };
                        if !passes {
                            Value::Null
                        } else {
                            expand_rows_boxed(
                                &mut candidate_rows,
                                related_entity,
                                registry,
                                provider,
                                dialect,
                                &expand.expand,
                                depth + 1,
                                ctx,
                                cancel,
                            )
                            .await?;
                            serde_json::to_value(&candidate_rows[0]).unwrap_or(Value::Null)
                        }
                    }
                };
                row.insert(property.name.clone(), value);
            }
        }
    }
    Ok(())
}

fn expand_rows_boxed<'a>(
    rows: &'a mut [OrderedEntity],
    entity: &'a EntityMetadata,
    registry: &'a MetadataRegistry,
    provider: &'a dyn DatabaseProvider,
    dialect: &'a dyn Dialect,
    expands: &'a [ExpandOption],
    depth: usize,
    ctx: &'a mut ExpandContext,
    cancel: &'a CancellationToken,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(expand_rows(rows, entity, registry, provider, dialect, expands, depth, ctx, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracking_trips_past_the_configured_max() {
        let ctx = ExpandContext::new(2);
        assert!(!ctx.depth_exceeded(2));
        assert!(ctx.depth_exceeded(3));
    }

    #[test]
    fn revisiting_the_same_resource_key_is_detected() {
        let mut ctx = ExpandContext::new(5);
        assert!(ctx.mark_visited("FabOperacao", "1"));
        assert!(!ctx.mark_visited("FabOperacao", "1"));
    }
}
