//! REST client for the session service's create endpoint.

use serde::Deserialize;
use tracing::debug;

use sessvault_protocol::RemoteLocation;

use crate::error::CreateError;
use crate::types::RemoteConfig;

/// A freshly created remote session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSession {
    pub app_id: String,
    pub id: String,
    pub is_active: bool,
    pub name: String,
    pub scenario_id: String,
    pub scenario_name: String,
    /// First user of the session; the identity used to connect to it.
    pub principal: String,
    pub version: serde_json::Value,
}

impl CreatedSession {
    pub fn location(&self) -> RemoteLocation {
        RemoteLocation::new(self.id.clone(), self.principal.clone())
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(default)]
    success: bool,
    value: Option<SessionValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionValue {
    #[serde(default)]
    app_id: String,
    id: String,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    scenario_id: String,
    #[serde(default)]
    scenario_name: String,
    #[serde(default)]
    users: Vec<String>,
    #[serde(default)]
    version: serde_json::Value,
}

/// Session service REST client.
pub struct SessionApi {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    scenario_id: String,
}

impl SessionApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, CreateError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            scenario_id: config.scenario_id.clone(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Creates a new session named `name`.
    pub async fn create_session(&self, name: &str) -> Result<CreatedSession, CreateError> {
        let url = format!("{}/create", self.base_url);
        let form = [
            ("app", self.app_id.as_str()),
            ("scenarioId", self.scenario_id.as_str()),
            ("name", name),
        ];

        let resp = self.http.post(&url).form(&form).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CreateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let parsed: CreateResponse = serde_json::from_slice(&body)?;
        if !parsed.success {
            return Err(CreateError::Rejected("service reported failure".into()));
        }
        let value = parsed
            .value
            .ok_or_else(|| CreateError::Rejected("response carries no session".into()))?;
        let principal = value
            .users
            .into_iter()
            .next()
            .ok_or_else(|| CreateError::Rejected(format!("session {} has no users", value.id)))?;

        debug!(session = %value.id, %name, "session created");
        Ok(CreatedSession {
            app_id: value.app_id,
            id: value.id,
            is_active: value.is_active,
            name: value.name,
            scenario_id: value.scenario_id,
            scenario_name: value.scenario_name,
            principal,
            version: value.version,
        })
    }
}
