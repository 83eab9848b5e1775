//! Per-user context: which actions were carried out, and what was said.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::resolve_route;
use crate::config::AnnotatorConfig;
use crate::errors::{AnnotatorResult, NotFound};
use crate::taxonomy::ActionTaxonomy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedAction {
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_action_id: Option<String>,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub completed_actions: Vec<CompletedAction>,
    #[serde(default)]
    pub messages_history: Vec<Message>,
}

impl UserContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry out an action: resolve its route and record the completion.
    ///
    /// Nothing is recorded for an unknown action.
    pub fn do_action(
        &mut self,
        taxonomy: &ActionTaxonomy,
        action_id: &str,
        sub_action_id: Option<&str>,
    ) -> Result<String, NotFound> {
        let route = resolve_route(taxonomy, action_id, sub_action_id)?;
        debug!(action_id, route = %route, "action completed");
        self.completed_actions.push(CompletedAction {
            action_id: action_id.to_string(),
            sub_action_id: sub_action_id.map(str::to_string),
            route: route.clone(),
        });
        Ok(route)
    }

    /// Append a message and return its id. Ids follow the last recorded one.
    pub fn push_message(&mut self, text: impl Into<String>) -> u64 {
        let id = self.messages_history.last().map_or(1, |m| m.id + 1);
        self.messages_history.push(Message {
            id,
            text: text.into(),
        });
        id
    }

    /// Load from a JSON file. A missing file is an empty context.
    pub fn load(path: &Path) -> AnnotatorResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from `history_path`, or start empty when none is configured.
    pub fn load_configured(config: &AnnotatorConfig) -> AnnotatorResult<Self> {
        match &config.history_path {
            Some(path) => Self::load(path),
            None => {
                debug!("no history_path configured, starting with an empty user context");
                Ok(Self::default())
            }
        }
    }

    /// Save to `history_path` if one is configured. Returns whether anything was written.
    pub fn save_configured(&self, config: &AnnotatorConfig) -> AnnotatorResult<bool> {
        match &config.history_path {
            Some(path) => self.save(path).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn save(&self, path: &Path) -> AnnotatorResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(
            path = %path.display(),
            actions = self.completed_actions.len(),
            messages = self.messages_history.len(),
            "saved user context"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnnotatorError;
    use crate::taxonomy::ActionEntry;

    fn taxonomy() -> ActionTaxonomy {
        ActionTaxonomy::from_entries([(
            "book_flight",
            ActionEntry::new("vuelos").with_sub_action("search", "buscar"),
        )])
        .unwrap()
    }

    #[test]
    fn test_do_action_records_route() {
        let mut context = UserContext::new();
        let taxonomy = taxonomy();

        assert_eq!(
            context.do_action(&taxonomy, "book_flight", Some("search")).unwrap(),
            "/vuelos/buscar"
        );
        assert_eq!(
            context.do_action(&taxonomy, "book_flight", Some("missing")).unwrap(),
            "/vuelos"
        );

        assert_eq!(context.completed_actions.len(), 2);
        assert_eq!(context.completed_actions[0].sub_action_id.as_deref(), Some("search"));
        assert_eq!(context.completed_actions[1].route, "/vuelos");
    }

    #[test]
    fn test_unknown_action_records_nothing() {
        let mut context = UserContext::new();
        let err = context.do_action(&taxonomy(), "cancel", None).unwrap_err();
        assert_eq!(err.action_id, "cancel");
        assert!(context.completed_actions.is_empty());
    }

    #[test]
    fn test_push_message_ids() {
        let mut context = UserContext::new();
        assert_eq!(context.push_message("hola"), 1);
        assert_eq!(context.push_message("quiero un vuelo"), 2);
        assert_eq!(context.messages_history[1].text, "quiero un vuelo");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user-context.json");

        assert_eq!(UserContext::load(&path).unwrap(), UserContext::default());

        let mut context = UserContext::new();
        context.do_action(&taxonomy(), "book_flight", None).unwrap();
        context.push_message("hola");
        context.save(&path).unwrap();

        let mut loaded = UserContext::load(&path).unwrap();
        assert_eq!(loaded, context);
        assert_eq!(loaded.push_message("otra vez"), 2);
    }

    #[test]
    fn test_load_partial_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user-context.json");

        std::fs::write(&path, r#"{"messages_history": [{"id": 7, "text": "hola"}]}"#).unwrap();
        let context = UserContext::load(&path).unwrap();
        assert!(context.completed_actions.is_empty());
        assert_eq!(context.messages_history[0].id, 7);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            UserContext::load(&path),
            Err(AnnotatorError::Serialization(_))
        ));
    }

    #[test]
    fn test_configured_history_path() {
        let dir = tempfile::tempdir().unwrap();
        let unset = AnnotatorConfig::default();
        let config = AnnotatorConfig {
            history_path: Some(dir.path().join("history.json")),
            ..Default::default()
        };

        let mut context = UserContext::load_configured(&config).unwrap();
        assert_eq!(context, UserContext::default());
        context.push_message("hola");

        assert!(!context.save_configured(&unset).unwrap());
        assert!(context.save_configured(&config).unwrap());
        assert!(dir.path().join("history.json").exists());

        assert_eq!(UserContext::load_configured(&config).unwrap(), context);
        assert_eq!(UserContext::load_configured(&unset).unwrap(), UserContext::default());
    }
}
