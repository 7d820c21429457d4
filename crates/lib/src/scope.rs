//! Client scope: the (optional) client whose reference files the backend consults.
//!
//! Scope and conversation history are independent: changing the scope never touches the log.

use serde::{Deserialize, Serialize};

/// A selected client. Only `id` is sent upstream; `name` is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientScope {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ClientScope {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// Holds at most one selected client.
#[derive(Debug, Clone, Default)]
pub struct ScopeSelector {
    current: Option<ClientScope>,
}

impl ScopeSelector {
    pub fn current(&self) -> Option<&ClientScope> {
        self.current.as_ref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.id.as_str())
    }

    /// Select `scope`, or clear when `None`. Returns the previous selection.
    pub fn select(&mut self, scope: Option<ClientScope>) -> Option<ClientScope> {
        std::mem::replace(&mut self.current, scope)
    }

    pub fn clear(&mut self) -> Option<ClientScope> {
        self.current.take()
    }

    /// Selecting the client that is already selected deselects it.
    pub fn toggle(&mut self, scope: ClientScope) {
        if self.client_id() == Some(scope.id.as_str()) {
            self.current = None;
        } else {
            self.current = Some(scope);
        }
    }

    /// Clear the selection if it points at `client_id` (e.g. the client was deleted).
    pub fn clear_if(&mut self, client_id: &str) -> bool {
        if self.client_id() == Some(client_id) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_selects_then_deselects() {
        let mut s = ScopeSelector::default();
        s.toggle(ClientScope::named("c1", "Acme"));
        assert_eq!(s.client_id(), Some("c1"));
        s.toggle(ClientScope::new("c2"));
        assert_eq!(s.client_id(), Some("c2"));
        s.toggle(ClientScope::new("c2"));
        assert_eq!(s.current(), None);
    }

    #[test]
    fn clear_if_only_matches_selected() {
        let mut s = ScopeSelector::default();
        s.select(Some(ClientScope::new("c1")));
        assert!(!s.clear_if("c2"));
        assert_eq!(s.client_id(), Some("c1"));
        assert!(s.clear_if("c1"));
        assert_eq!(s.client_id(), None);
    }

    #[test]
    fn select_returns_previous() {
        let mut s = ScopeSelector::default();
        assert_eq!(s.select(Some(ClientScope::new("a"))), None);
        assert_eq!(s.select(None).map(|c| c.id), Some("a".to_string()));
    }
}
