//! URL parser (spec §4.3): a bracket-and-quote-aware splitter that ignores
//! `&` and `;` inside parentheses and string literals, extracts `$`-prefixed
//! system options, and caches parsed results behind a small bounded LRU.

use crate::text::{is_balanced, split_top_level};
use lru::LruCache;
use odata_core::{Error, Result};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// A raw query string split into key → URL-decoded value pairs. `$`-prefixed
/// keys are OData system options; anything else is a custom query
/// parameter left for the caller.
pub type RawOptions = HashMap<String, String>;

/// Splits and URL-decodes `raw` (the part of the URL after `?`). Rejects
/// unbalanced parentheses/quotes so a malformed `$filter=` value is caught
/// before it reaches the tokenizer.
pub fn parse_raw_query(raw: &str) -> Result<RawOptions> {
    let mut map = HashMap::new();
    for pair in split_top_level(raw, &['&', ';']) {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if !is_balanced(value) {
            return Err(Error::parse(format!("unbalanced parentheses or quotes in '{key}'")));
        }
        let key = urlencoding::decode(key)
            .map_err(|e| Error::parse(format!("invalid percent-encoding in key: {e}")))?
            .into_owned();
        let value = urlencoding::decode(value)
            .map_err(|e| Error::parse(format!("invalid percent-encoding in value: {e}")))?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

/// `true` for OData system options (`$filter`, `$select`, …); anything else
/// is either a custom query parameter or, if `$`-prefixed and unrecognized,
/// a 400 per §6 ("Unknown `$`-prefixed options → 400").
pub fn is_system_option(key: &str) -> bool {
    key.starts_with('$')
}

pub const KNOWN_SYSTEM_OPTIONS: &[&str] = &[
    "$filter", "$select", "$orderby", "$top", "$skip", "$count", "$expand", "$compute", "$search",
];

pub fn reject_unknown_system_options(raw: &RawOptions) -> Result<()> {
    for key in raw.keys() {
        if is_system_option(key) && !KNOWN_SYSTEM_OPTIONS.contains(&key.as_str()) {
            return Err(Error::parse(format!("unknown system option: {key}")));
        }
    }
    Ok(())
}

/// Bounded LRU of `raw query string → parsed options`. Reads take a short
/// lock only to clone the cached `Arc`, so a cache miss being filled by one
/// request never blocks a concurrent lookup from corrupting state — the
/// `Arc` handed back from `get_or_parse` is immutable once constructed.
pub struct UrlParseCache {
    inner: Mutex<LruCache<String, Arc<RawOptions>>>,
}

impl UrlParseCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn get_or_parse(&self, raw: &str) -> Result<Arc<RawOptions>> {
        {
            let mut guard = self.inner.lock().expect("url parse cache poisoned");
            if let Some(hit) = guard.get(raw) {
                return Ok(Arc::clone(hit));
            }
        }
        let parsed = Arc::new(parse_raw_query(raw)?);
        let mut guard = self.inner.lock().expect("url parse cache poisoned");
        guard.put(raw.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("url parse cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UrlParseCache {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_ampersand_and_decodes() {
        let opts = parse_raw_query("$filter=Name%20eq%20'John'&$top=10").unwrap();
        assert_eq!(opts.get("$filter").unwrap(), "Name eq 'John'");
        assert_eq!(opts.get("$top").unwrap(), "10");
    }

    #[test]
    fn ampersand_inside_parens_does_not_split() {
        let opts = parse_raw_query("$filter=contains(Name,'a%26b')&$top=1").unwrap();
        assert!(opts.contains_key("$filter"));
        assert!(opts.contains_key("$top"));
    }

    #[test]
    fn unbalanced_value_is_rejected() {
        assert!(parse_raw_query("$filter=contains(Name,'a'").is_err());
    }

    #[test]
    fn unknown_system_option_is_rejected() {
        let opts = parse_raw_query("$bogus=1").unwrap();
        assert!(reject_unknown_system_options(&opts).is_err());
    }

    #[test]
    fn known_system_options_pass() {
        let opts = parse_raw_query("$filter=Age eq 1&$top=5").unwrap();
        assert!(reject_unknown_system_options(&opts).is_ok());
    }

    #[test]
    fn cache_returns_equal_results_on_repeat_lookup() {
        let cache = UrlParseCache::new(4);
        let a = cache.get_or_parse("$top=1").unwrap();
        let b = cache.get_or_parse("$top=1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn cache_evicts_least_recently_used_beyond_capacity() {
        let cache = UrlParseCache::new(1);
        cache.get_or_parse("$top=1").unwrap();
        cache.get_or_parse("$top=2").unwrap();
        assert_eq!(cache.len(), 1);
    }
}
