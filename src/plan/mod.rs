//! Bundle plan types and shared-module extraction
//!
//! A plan is an ordered list of [`BundleConfig`]s. Collectors produce one
//! bundle per page type; [`extract_common_bundle`] then moves every module
//! used by two or more bundles into a trailing `common` bundle.

pub mod writer;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::utils::constants::COMMON_BUNDLE_NAME;

pub use writer::write_plan;

/// Module name to unbundled path, ordered by name for stable output
pub type ModuleMap = BTreeMap<String, String>;

/// The page(s) a bundle was collected from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleUrl {
    Single(String),
    List(Vec<String>),
    /// Several pages keyed by their role, e.g. `cart` and `checkout`
    Map(BTreeMap<String, String>),
}

impl Default for BundleUrl {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub name: String,
    #[serde(default)]
    pub url: BundleUrl,
    #[serde(default)]
    pub modules: ModuleMap,
}

impl BundleConfig {
    pub fn new(name: impl Into<String>, url: BundleUrl) -> Self {
        Self {
            name: name.into(),
            url,
            modules: ModuleMap::new(),
        }
    }

    /// Add discovered modules; a later path for the same name wins
    pub fn merge_modules(&mut self, modules: ModuleMap) {
        self.modules.extend(modules);
    }

    #[must_use]
    pub fn is_common(&self) -> bool {
        self.name == COMMON_BUNDLE_NAME
    }

    /// One-line summary, `<name> - <count> items.`
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} - {} items.", self.name, self.modules.len())
    }
}

/// Move modules shared by two or more bundles into the `common` bundle
///
/// The common bundle is appended last, or reused if the input already has
/// one. A shared module keeps the path of the first bundle that listed it.
/// When nothing is shared the input is returned unchanged, which makes the
/// operation idempotent.
#[must_use]
pub fn extract_common_bundle(bundles: Vec<BundleConfig>) -> Vec<BundleConfig> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for bundle in &bundles {
        for name in bundle.modules.keys() {
            *frequency.entry(name.as_str()).or_default() += 1;
        }
    }

    let shared: HashSet<String> = frequency
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(name, _)| name.to_string())
        .collect();

    if shared.is_empty() {
        return bundles;
    }

    let mut common_modules = ModuleMap::new();
    let mut existing_common = None;
    let mut result = Vec::with_capacity(bundles.len() + 1);

    for mut bundle in bundles {
        let (moved, kept): (ModuleMap, ModuleMap) = std::mem::take(&mut bundle.modules)
            .into_iter()
            .partition(|(name, _)| shared.contains(name));
        bundle.modules = kept;

        for (name, path) in moved {
            common_modules.entry(name).or_insert(path);
        }

        if bundle.is_common() && existing_common.is_none() {
            existing_common = Some(bundle);
        } else {
            result.push(bundle);
        }
    }

    let mut common = existing_common
        .unwrap_or_else(|| BundleConfig::new(COMMON_BUNDLE_NAME, BundleUrl::default()));
    common.modules.extend(common_modules);
    result.push(common);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let mut b = BundleConfig::new("cms", BundleUrl::default());
        assert_eq!(b.summary(), "cms - 0 items.");
        b.merge_modules(ModuleMap::from([
            ("a".to_string(), "a".to_string()),
            ("b".to_string(), "b".to_string()),
        ]));
        assert_eq!(b.summary(), "cms - 2 items.");
    }

    fn bundle(name: &str, modules: &[(&str, &str)]) -> BundleConfig {
        BundleConfig {
            name: name.to_string(),
            url: BundleUrl::default(),
            modules: modules
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_single_bundle_is_untouched() {
        let input = vec![bundle("cms", &[("jquery", "jquery")])];
        assert_eq!(extract_common_bundle(input.clone()), input);
    }

    #[test]
    fn test_first_definer_path_wins() {
        let out = extract_common_bundle(vec![
            bundle("a", &[("x", "path/one")]),
            bundle("b", &[("x", "path/two")]),
        ]);
        let common = out.last().expect("common bundle appended");
        assert_eq!(common.name, "common");
        assert_eq!(common.modules.get("x").map(String::as_str), Some("path/one"));
        assert!(out[0].modules.is_empty());
        assert!(out[1].modules.is_empty());
    }

    #[test]
    fn test_existing_common_is_reused_and_moved_last() {
        let out = extract_common_bundle(vec![
            bundle("common", &[("base", "base")]),
            bundle("a", &[("x", "x"), ("only-a", "a")]),
            bundle("b", &[("x", "x")]),
        ]);
        let names: Vec<_> = out.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "common"]);
        let common = &out[2];
        assert!(common.modules.contains_key("base"));
        assert!(common.modules.contains_key("x"));
    }

    #[test]
    fn test_bundle_url_shapes_serialize_untagged() {
        let single = serde_json::to_value(BundleUrl::Single("https://a.test/".into()))
            .expect("serializes");
        assert_eq!(single, serde_json::json!("https://a.test/"));

        let map: BundleUrl = serde_json::from_value(serde_json::json!({"cart": "c"}))
            .expect("deserializes");
        assert!(matches!(map, BundleUrl::Map(_)));
    }
}
