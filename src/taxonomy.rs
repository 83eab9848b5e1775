//! The action taxonomy: actions, their routes, labels, and sub-actions.
//!
//! A taxonomy is loaded once (from a JSON or TOML file, or from the label
//! metadata service) and then shared read-only. Construction validates the
//! invariants so lookups never have to.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::TaxonomyError;

/// Free-form metadata attached to a label.
pub type LabelMetadata = serde_json::Value;

/// A sub-action reachable below its parent action's route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAction {
    pub id: String,
    pub route: String,
}

/// One action of the taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Route or handler name used to build navigation paths.
    pub route: String,
    /// Label name -> metadata, in declaration order.
    #[serde(default)]
    pub labels: IndexMap<String, LabelMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_actions: Vec<SubAction>,
}

impl ActionEntry {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            labels: IndexMap::new(),
            sub_actions: Vec::new(),
        }
    }

    pub fn with_label(mut self, name: impl Into<String>) -> Self {
        self.labels.insert(name.into(), LabelMetadata::Null);
        self
    }

    pub fn with_sub_action(mut self, id: impl Into<String>, route: impl Into<String>) -> Self {
        self.sub_actions.push(SubAction {
            id: id.into(),
            route: route.into(),
        });
        self
    }

    pub fn sub_action(&self, id: &str) -> Option<&SubAction> {
        self.sub_actions.iter().find(|s| s.id == id)
    }
}

/// Action id -> [`ActionEntry`], validated at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionTaxonomy {
    actions: IndexMap<String, ActionEntry>,
}

impl<'de> Deserialize<'de> for ActionTaxonomy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let actions = IndexMap::<String, ActionEntry>::deserialize(deserializer)?;
        ActionTaxonomy::new(actions).map_err(serde::de::Error::custom)
    }
}

impl ActionTaxonomy {
    /// Build a taxonomy, checking its invariants.
    ///
    /// Action ids and label names are unique by construction (map keys);
    /// sub-action ids are checked here.
    pub fn new(actions: IndexMap<String, ActionEntry>) -> Result<Self, TaxonomyError> {
        for (action_id, entry) in &actions {
            if action_id.trim().is_empty() {
                return Err(TaxonomyError::EmptyActionId);
            }
            if entry.route.trim().is_empty() {
                return Err(TaxonomyError::EmptyRoute {
                    action_id: action_id.clone(),
                });
            }
            if entry.labels.keys().any(|l| l.trim().is_empty()) {
                return Err(TaxonomyError::EmptyLabel {
                    action_id: action_id.clone(),
                });
            }

            let mut seen = std::collections::HashSet::new();
            for sub in &entry.sub_actions {
                if !seen.insert(sub.id.as_str()) {
                    return Err(TaxonomyError::DuplicateSubAction {
                        action_id: action_id.clone(),
                        sub_action_id: sub.id.clone(),
                    });
                }
                if sub.route.trim().is_empty() {
                    return Err(TaxonomyError::EmptyRoute {
                        action_id: format!("{}/{}", action_id, sub.id),
                    });
                }
            }
        }

        Ok(Self { actions })
    }

    /// Build from `(action id, entry)` pairs. Later duplicates replace earlier ones.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, TaxonomyError>
    where
        I: IntoIterator<Item = (S, ActionEntry)>,
        S: Into<String>,
    {
        Self::new(entries.into_iter().map(|(id, e)| (id.into(), e)).collect())
    }

    /// Build the label-only read model served by the label metadata service:
    /// `{action_id: {label: metadata}}`. Each action's route is its id.
    pub fn from_label_catalog(
        catalog: IndexMap<String, IndexMap<String, LabelMetadata>>,
    ) -> Result<Self, TaxonomyError> {
        Self::new(
            catalog
                .into_iter()
                .map(|(action_id, labels)| {
                    let entry = ActionEntry {
                        route: action_id.clone(),
                        labels,
                        sub_actions: Vec::new(),
                    };
                    (action_id, entry)
                })
                .collect(),
        )
    }

    pub fn from_json_str(input: &str) -> Result<Self, TaxonomyError> {
        serde_json::from_str(input).map_err(|e| TaxonomyError::Parse(e.to_string()))
    }

    pub fn from_toml_str(input: &str) -> Result<Self, TaxonomyError> {
        toml::from_str(input).map_err(|e| TaxonomyError::Parse(e.to_string()))
    }

    /// Load from a `.json` or `.toml` file, picked by extension (JSON otherwise).
    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let content = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let taxonomy = if path.extension().map_or(false, |e| e == "toml") {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        info!(
            path = %path.display(),
            actions = taxonomy.len(),
            "loaded action taxonomy"
        );
        Ok(taxonomy)
    }

    pub fn get(&self, action_id: &str) -> Option<&ActionEntry> {
        self.actions.get(action_id)
    }

    pub fn contains(&self, action_id: &str) -> bool {
        self.actions.contains_key(action_id)
    }

    /// Action ids in declaration order.
    pub fn action_ids(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAXONOMY_JSON: &str = r#"{
        "book_flight": {
            "route": "book_flight",
            "labels": {"origin": {"color": "red"}, "destination": null, "date": null},
            "sub_actions": [{"id": "search", "route": "search"}]
        },
        "greet": {"route": "greet", "labels": {"greeting": null}}
    }"#;

    #[test]
    fn test_from_json_preserves_order() {
        let taxonomy = ActionTaxonomy::from_json_str(TAXONOMY_JSON).unwrap();
        assert_eq!(taxonomy.action_ids().collect::<Vec<_>>(), vec!["book_flight", "greet"]);

        let labels: Vec<_> = taxonomy.get("book_flight").unwrap().labels.keys().collect();
        assert_eq!(labels, vec!["origin", "destination", "date"]);
    }

    #[test]
    fn test_from_toml() {
        let taxonomy = ActionTaxonomy::from_toml_str(
            r#"
[book_flight]
route = "book_flight"
sub_actions = [{ id = "search", route = "search" }]

[book_flight.labels]
origin = {}
destination = {}
"#,
        )
        .unwrap();
        let entry = taxonomy.get("book_flight").unwrap();
        assert_eq!(entry.labels.len(), 2);
        assert_eq!(entry.sub_action("search").unwrap().route, "search");
    }

    #[test]
    fn test_duplicate_sub_action_rejected() {
        let err = ActionTaxonomy::from_entries([(
            "book_flight",
            ActionEntry::new("book_flight")
                .with_sub_action("search", "search")
                .with_sub_action("search", "find"),
        )])
        .unwrap_err();
        assert!(matches!(err, TaxonomyError::DuplicateSubAction { .. }));
    }

    #[test]
    fn test_empty_route_rejected_during_deserialize() {
        let err = ActionTaxonomy::from_json_str(r#"{"x": {"route": " "}}"#).unwrap_err();
        assert!(err.to_string().contains("empty route"));
    }

    #[test]
    fn test_empty_label_rejected() {
        let err =
            ActionTaxonomy::from_entries([("greet", ActionEntry::new("greet").with_label(""))])
                .unwrap_err();
        assert!(matches!(err, TaxonomyError::EmptyLabel { .. }));
    }

    #[test]
    fn test_from_label_catalog() {
        let catalog: IndexMap<String, IndexMap<String, LabelMetadata>> =
            serde_json::from_str(r#"{"greet": {"greeting": {}, "name": {}}}"#).unwrap();
        let taxonomy = ActionTaxonomy::from_label_catalog(catalog).unwrap();
        let entry = taxonomy.get("greet").unwrap();
        assert_eq!(entry.route, "greet");
        assert_eq!(entry.labels.keys().collect::<Vec<_>>(), vec!["greeting", "name"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, TAXONOMY_JSON).unwrap();

        let taxonomy = ActionTaxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.len(), 2);

        let missing = ActionTaxonomy::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, TaxonomyError::Read { .. }));
    }
}
