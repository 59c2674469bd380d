//! Configured maxima (spec §6, defaults listed there). Hot-reloadable via
//! `odata-config`; the pipeline only ever sees this snapshot.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_filter_len: usize,
    pub max_search_len: usize,
    pub max_select_len: usize,
    pub max_orderby_len: usize,
    pub max_expand_depth: usize,
    pub max_top: u32,
    pub max_skip: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_filter_len: 5000,
            max_search_len: 1000,
            max_select_len: 1000,
            max_orderby_len: 500,
            max_expand_depth: 5,
            max_top: 1000,
            max_skip: 100_000,
        }
    }
}
