use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) full_name: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum RosterError {
    #[error("roster request failed: {0}")]
    Request(String),
    #[error("roster response malformed: {0}")]
    Malformed(String),
}

/// Resolves which students belong to a module. The roster lives in another
/// service; this core only consumes the contract.
#[async_trait]
pub(crate) trait Roster: Send + Sync {
    async fn students_for_module(&self, module_id: &str) -> Result<Vec<Student>, RosterError>;
}

pub(crate) struct HttpRoster {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRoster {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let roster = settings.roster();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(roster.request_timeout_seconds))
            .build()?;

        Ok(Self { client, base_url: roster.base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl Roster for HttpRoster {
    async fn students_for_module(&self, module_id: &str) -> Result<Vec<Student>, RosterError> {
        let url = format!("{}/modules/{module_id}/students", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RosterError::Request(err.to_string()))?
            .error_for_status()
            .map_err(|err| RosterError::Request(err.to_string()))?;

        response.json::<Vec<Student>>().await.map_err(|err| RosterError::Malformed(err.to_string()))
    }
}
