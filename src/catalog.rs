//! Label catalog resolution: which labels an action offers, and where it routes.

use tracing::debug;

use crate::errors::NotFound;
use crate::taxonomy::ActionTaxonomy;

/// Ordered label names for `action_id`, or an empty list if it is unknown.
///
/// Never fails: an unknown action simply has no labels available.
pub fn resolve_labels(taxonomy: &ActionTaxonomy, action_id: &str) -> Vec<String> {
    taxonomy
        .get(action_id)
        .map(|entry| entry.labels.keys().cloned().collect())
        .unwrap_or_default()
}

/// Navigation path for an action and optional sub-action.
///
/// Returns `"/{route}"` or `"/{route}/{sub_route}"`. An unknown sub-action
/// falls back to the action-only route rather than failing.
pub fn resolve_route(
    taxonomy: &ActionTaxonomy,
    action_id: &str,
    sub_action_id: Option<&str>,
) -> Result<String, NotFound> {
    let entry = taxonomy.get(action_id).ok_or_else(|| NotFound {
        action_id: action_id.to_string(),
    })?;

    let mut route = format!("/{}", entry.route);
    if let Some(sub_id) = sub_action_id {
        match entry.sub_action(sub_id) {
            Some(sub) => {
                route.push('/');
                route.push_str(&sub.route);
            }
            None => {
                debug!(
                    action_id,
                    sub_action_id = sub_id,
                    "unknown sub-action, falling back to action route"
                );
            }
        }
    }
    Ok(route)
}

/// The labels of one selected action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelCatalog {
    action_id: String,
    labels: Vec<String>,
}

impl LabelCatalog {
    /// Resolve the catalog for `action_id`. Unknown actions yield an empty catalog.
    pub fn resolve(taxonomy: &ActionTaxonomy, action_id: &str) -> Self {
        Self {
            action_id: action_id.to_string(),
            labels: resolve_labels(taxonomy, action_id),
        }
    }

    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at a list index, as picked from a dropdown.
    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ActionEntry;

    fn taxonomy() -> ActionTaxonomy {
        ActionTaxonomy::from_entries([
            (
                "book_flight",
                ActionEntry::new("book_flight")
                    .with_label("origin")
                    .with_label("destination")
                    .with_sub_action("search", "search"),
            ),
            ("greet", ActionEntry::new("saludo").with_label("greeting")),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_labels_in_order() {
        assert_eq!(
            resolve_labels(&taxonomy(), "book_flight"),
            vec!["origin".to_string(), "destination".to_string()]
        );
    }

    #[test]
    fn test_resolve_labels_unknown_is_empty() {
        let taxonomy = taxonomy();
        assert!(resolve_labels(&taxonomy, "nope").is_empty());
        assert!(resolve_labels(&taxonomy, "").is_empty());
        assert!(resolve_labels(&ActionTaxonomy::default(), "book_flight").is_empty());
    }

    #[test]
    fn test_resolve_route() {
        let taxonomy = taxonomy();
        assert_eq!(resolve_route(&taxonomy, "book_flight", None).unwrap(), "/book_flight");
        assert_eq!(
            resolve_route(&taxonomy, "book_flight", Some("search")).unwrap(),
            "/book_flight/search"
        );
        // Route name, not id
        assert_eq!(resolve_route(&taxonomy, "greet", None).unwrap(), "/saludo");
    }

    #[test]
    fn test_unknown_sub_action_falls_back() {
        assert_eq!(
            resolve_route(&taxonomy(), "book_flight", Some("confirm")).unwrap(),
            "/book_flight"
        );
    }

    #[test]
    fn test_unknown_action_not_found() {
        let err = resolve_route(&taxonomy(), "cancel", Some("confirm")).unwrap_err();
        assert_eq!(
            err,
            NotFound {
                action_id: "cancel".to_string()
            }
        );
    }

    #[test]
    fn test_label_catalog() {
        let catalog = LabelCatalog::resolve(&taxonomy(), "book_flight");
        assert_eq!(catalog.action_id(), "book_flight");
        assert_eq!(catalog.label_at(1), Some("destination"));
        assert_eq!(catalog.label_at(2), None);
        assert!(catalog.contains("origin"));

        assert!(LabelCatalog::resolve(&taxonomy(), "nope").is_empty());
    }
}
