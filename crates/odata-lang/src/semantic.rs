//! Semantic analysis (spec §4.5): resolves every identifier in a parsed
//! `QueryOptions` against `EntityMetadata`, checks function arity, and
//! rejects `$compute` alias collisions. Runs after syntax parsing and
//! before SQL building.

use crate::kinds;
use crate::query::QueryOptions;
use odata_core::{EntityMetadata, Error, MetadataRegistry, ParseNode, Result};
use std::collections::HashSet;
use std::sync::LazyLock;

/// `(min_arity, max_arity)` for the built-in filter/compute functions.
static FUNCTION_SIGNATURES: LazyLock<std::collections::HashMap<&'static str, (usize, usize)>> =
    LazyLock::new(|| {
        [
            ("contains", (2, 2)),
            ("startswith", (2, 2)),
            ("endswith", (2, 2)),
            ("indexof", (2, 2)),
            ("substring", (2, 3)),
            ("concat", (2, 2)),
            ("tolower", (1, 1)),
            ("toupper", (1, 1)),
            ("trim", (1, 1)),
            ("length", (1, 1)),
            ("year", (1, 1)),
            ("month", (1, 1)),
            ("day", (1, 1)),
            ("hour", (1, 1)),
            ("minute", (1, 1)),
            ("second", (1, 1)),
            ("round", (1, 1)),
            ("floor", (1, 1)),
            ("ceiling", (1, 1)),
            ("now", (0, 0)),
        ]
        .into_iter()
        .collect()
    });

/// Resolves a (possibly dotted) navigation path like `FabOperacao.Nome`
/// against `entity`, descending through `registry` for each navigation hop.
fn resolve_path(entity: &EntityMetadata, registry: &MetadataRegistry, path: &str) -> Result<()> {
    let mut current = entity;
    let segments: Vec<&str> = path.split('.').collect();
    for (index, segment) in segments.iter().enumerate() {
        let property = current.find_property(segment).ok_or_else(|| {
            Error::semantic(format!("unknown property '{segment}' on '{}'", current.name))
        })?;
        let is_last = index == segments.len() - 1;
        if !is_last {
            if !property.is_navigation {
                return Err(Error::semantic(format!(
                    "'{segment}' is not a navigation property on '{}'",
                    current.name
                )));
            }
            let related_type = property.related_type.as_deref().ok_or_else(|| {
                Error::semantic(format!("navigation property '{segment}' has no related type"))
            })?;
            current = registry.get(related_type).ok_or_else(|| {
                Error::semantic(format!("unknown related entity type '{related_type}'"))
            })?;
        }
    }
    Ok(())
}

fn check_function_arity(name: &str, arity: usize) -> Result<()> {
    let key = name.to_ascii_lowercase();
    match FUNCTION_SIGNATURES.get(key.as_str()) {
        Some((min, max)) if (*min..=*max).contains(&arity) => Ok(()),
        Some((min, max)) if min == max => Err(Error::semantic(format!(
            "function '{name}' expects {min} argument(s), got {arity}"
        ))),
        Some((min, max)) => Err(Error::semantic(format!(
            "function '{name}' expects between {min} and {max} argument(s), got {arity}"
        ))),
        None => Err(Error::semantic(format!("unknown function '{name}'"))),
    }
}

fn walk_expression_tree(
    node: &ParseNode,
    entity: &EntityMetadata,
    registry: &MetadataRegistry,
    errors: &mut Vec<Error>,
) {
    match node.token.kind {
        kinds::IDENT => {
            if let Err(err) = resolve_path(entity, registry, &node.token.value) {
                errors.push(err);
            }
        }
        kinds::FUNCTION => {
            if let Err(err) = check_function_arity(&node.token.value, node.children.len()) {
                errors.push(err);
            }
        }
        _ => {}
    }
    for child in &node.children {
        walk_expression_tree(child, entity, registry, errors);
    }
}

/// Validates every clause of `options` against `entity`/`registry`,
/// accumulating as many independent errors as possible rather than
/// stopping at the first one.
pub fn analyze(
    entity: &EntityMetadata,
    registry: &MetadataRegistry,
    options: &QueryOptions,
) -> std::result::Result<(), Vec<Error>> {
    let mut errors = Vec::new();

    if let Some(filter) = &options.filter {
        walk_expression_tree(filter, entity, registry, &mut errors);
    }

    if let Some(search) = &options.search {
        // free-text search has no property references to resolve; nothing
        // further to check here beyond what syntax parsing already did.
        let _ = search;
    }

    if let Some(select) = &options.select {
        for name in select {
            if let Err(err) = resolve_path(entity, registry, name) {
                errors.push(err);
            }
        }
    }

    if let Some(order_by) = &options.order_by {
        for key in order_by {
            match entity.find_property(&key.property) {
                Some(property) if property.is_navigation => errors.push(Error::semantic(format!(
                    "cannot order by navigation property '{}'",
                    key.property
                ))),
                Some(_) => {}
                None => errors.push(Error::semantic(format!(
                    "unknown property '{}' in $orderby",
                    key.property
                ))),
            }
        }
    }

    for expand in &options.expand {
        match entity.find_property(&expand.property) {
            Some(property) if !property.is_navigation => errors.push(Error::semantic(format!(
                "'{}' is not a navigation property",
                expand.property
            ))),
            Some(property) => {
                if let Some(related_type) = &property.related_type {
                    if registry.get(related_type).is_none() {
                        errors.push(Error::semantic(format!(
                            "unknown related entity type '{related_type}' for expand '{}'",
                            expand.property
                        )));
                    }
                }
            }
            None => errors.push(Error::semantic(format!(
                "unknown navigation property '{}' in $expand",
                expand.property
            ))),
        }
    }

    let mut seen_aliases: HashSet<String> = HashSet::new();
    for compute in &options.compute {
        walk_expression_tree(&compute.parse_tree, entity, registry, &mut errors);
        let key = compute.alias.to_ascii_lowercase();
        if entity.find_property(&compute.alias).is_some() {
            errors.push(Error::semantic(format!(
                "$compute alias '{}' collides with an existing property",
                compute.alias
            )));
        } else if !seen_aliases.insert(key) {
            errors.push(Error::semantic(format!(
                "duplicate $compute alias '{}'",
                compute.alias
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query_options;
    use crate::limits::Limits;
    use odata_core::{PropertyMetadata, PropertyType, Relationship};

    fn products() -> (EntityMetadata, MetadataRegistry) {
        let categories = EntityMetadata::new(
            "Categories",
            vec![
                PropertyMetadata::scalar("ID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("Name", PropertyType::String),
            ],
        );
        let products = EntityMetadata::new(
            "Products",
            vec![
                PropertyMetadata::scalar("ID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("Name", PropertyType::String),
                PropertyMetadata::scalar("Price", PropertyType::Float64),
                PropertyMetadata::navigation(
                    "Category",
                    "Categories",
                    false,
                    Relationship {
                        local_property: "CategoryID".into(),
                        referenced_property: "ID".into(),
                    },
                ),
            ],
        );
        let mut registry = MetadataRegistry::new();
        registry.register(categories);
        registry.register(products.clone());
        (products, registry)
    }

    #[test]
    fn valid_filter_and_select_pass() {
        let (entity, registry) = products();
        let options =
            parse_query_options("$filter=Price gt 10&$select=Name,Price", &Limits::default())
                .unwrap();
        assert!(analyze(&entity, &registry, &options).is_ok());
    }

    #[test]
    fn unknown_property_in_filter_is_rejected() {
        let (entity, registry) = products();
        let options = parse_query_options("$filter=Bogus eq 1", &Limits::default()).unwrap();
        let errors = analyze(&entity, &registry, &options).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn dotted_navigation_path_resolves_through_registry() {
        let (entity, registry) = products();
        let options =
            parse_query_options("$filter=Category.Name eq 'Books'", &Limits::default()).unwrap();
        assert!(analyze(&entity, &registry, &options).is_ok());
    }

    #[test]
    fn function_arity_mismatch_is_rejected() {
        let (entity, registry) = products();
        let options = parse_query_options("$filter=contains(Name)", &Limits::default()).unwrap();
        let errors = analyze(&entity, &registry, &options).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("contains")));
    }

    #[test]
    fn expand_on_scalar_property_is_rejected() {
        let (entity, registry) = products();
        let options = parse_query_options("$expand=Name", &Limits::default()).unwrap();
        let errors = analyze(&entity, &registry, &options).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn compute_alias_colliding_with_property_is_rejected() {
        let (entity, registry) = products();
        let options =
            parse_query_options("$compute=Price mul 2 as Price", &Limits::default()).unwrap();
        let errors = analyze(&entity, &registry, &options).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("collides")));
    }

    #[test]
    fn orderby_on_navigation_property_is_rejected() {
        let (entity, registry) = products();
        let options = parse_query_options("$orderby=Category", &Limits::default()).unwrap();
        let errors = analyze(&entity, &registry, &options).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("navigation")));
    }
}
