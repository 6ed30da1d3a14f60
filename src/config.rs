//! Probe configuration: where the API lives and what the probes send.

pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_FLAG_NAME: &str = "custom_agents";
pub const DEFAULT_PROMPT: &str = "Hello, test message";
pub const API_PREFIX: &str = "/api";

// =============================================================================
// API BASE
// =============================================================================

/// Builds endpoint URLs under the backend's `/api` prefix.
///
/// Without a base URL the result is a same-origin relative path, which the
/// transport resolves against its configured origin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiBase {
    base_url: Option<String>,
}

impl ApiBase {
    #[must_use]
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty());
        if base_url.is_none() {
            tracing::warn!("backend URL is not set; using same-origin relative API paths");
        }
        Self { base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// `/health` becomes `{base}/api/health`, or `/api/health` with no base.
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_owned()
        } else {
            format!("/{endpoint}")
        };
        let url = match &self.base_url {
            Some(base) => format!("{base}{API_PREFIX}{endpoint}"),
            None => format!("{API_PREFIX}{endpoint}"),
        };
        tracing::debug!(%url, "resolved API url");
        url
    }
}

// =============================================================================
// PROBE SETTINGS
// =============================================================================

/// Multipart fields sent to the agent initiation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateForm {
    pub prompt: String,
    pub model_name: Option<String>,
    pub enable_thinking: Option<bool>,
    pub stream: Option<bool>,
    pub enable_context_manager: Option<bool>,
}

impl Default for InitiateForm {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_owned(),
            model_name: None,
            enable_thinking: None,
            stream: None,
            enable_context_manager: None,
        }
    }
}

impl InitiateForm {
    /// Form fields in a stable order; unset options are omitted.
    #[must_use]
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![("prompt".to_owned(), self.prompt.clone())];
        if let Some(model) = &self.model_name {
            fields.push(("model_name".to_owned(), model.clone()));
        }
        let flags = [
            ("enable_thinking", self.enable_thinking),
            ("stream", self.stream),
            ("enable_context_manager", self.enable_context_manager),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                fields.push((name.to_owned(), value.to_string()));
            }
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub api: ApiBase,
    pub flag_name: String,
    pub initiate: InitiateForm,
}

impl ProbeSettings {
    #[must_use]
    pub fn new(api: ApiBase) -> Self {
        Self { api, flag_name: DEFAULT_FLAG_NAME.to_owned(), initiate: InitiateForm::default() }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
