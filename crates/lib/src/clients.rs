//! Client directory: read-only access to the user's client profiles in the hosted
//! backend's `clients` table (REST interface).
//!
//! Clients are created, edited and given reference files elsewhere; here they are only
//! listed so one can be picked as a chat's client scope.

use crate::config::{self, Config};
use crate::scope::ClientScope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const CLIENTS_PATH: &str = "/rest/v1/clients";

/// One row of the `clients` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    /// Reference files already uploaded for this client.
    #[serde(default)]
    pub openai_file_ids: Vec<String>,
    #[serde(default)]
    pub openai_vector_store_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Scope value to select this client in a chat.
    pub fn scope(&self) -> ClientScope {
        ClientScope::named(self.id.clone(), self.name.clone())
    }

    pub fn has_files(&self) -> bool {
        !self.openai_file_ids.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("client directory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("client directory api error: {0}")]
    Api(String),
    #[error("client directory not configured: {0}")]
    NotConfigured(&'static str),
}

/// Client for the `clients` REST table.
#[derive(Clone)]
pub struct ClientDirectory {
    base_url: String,
    anon_key: Option<String>,
    client: reqwest::Client,
}

impl ClientDirectory {
    pub fn new(base_url: impl Into<String>, anon_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DirectoryError> {
        let base_url = config::resolve_base_url(config)
            .ok_or(DirectoryError::NotConfigured("backend.baseUrl (or COPYDESK_BASE_URL)"))?;
        Ok(Self::new(base_url, config::resolve_anon_key(config)))
    }

    /// GET /rest/v1/clients?user_id=eq.{user} — newest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Client>, DirectoryError> {
        let filter = format!("eq.{}", user_id);
        self.fetch(&[
            ("select", "*"),
            ("user_id", filter.as_str()),
            ("order", "created_at.desc"),
        ])
        .await
    }

    /// GET /rest/v1/clients?id=eq.{id}. `None` when no such client exists.
    pub async fn get(&self, client_id: &str) -> Result<Option<Client>, DirectoryError> {
        let filter = format!("eq.{}", client_id);
        let rows = self
            .fetch(&[("select", "*"), ("id", filter.as_str())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch(&self, query: &[(&str, &str)]) -> Result<Vec<Client>, DirectoryError> {
        let url = format!("{}{}", self.base_url, CLIENTS_PATH);
        let mut req = self.client.get(&url).query(query);
        if let Some(key) = &self.anon_key {
            req = req.header("apikey", key).bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DirectoryError::Api(format!("{} {}", status, body.trim())));
        }
        Ok(res.json().await?)
    }
}
