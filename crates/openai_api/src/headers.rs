use std::collections::BTreeMap;

use crate::config::OpenAiApiConfig;
use crate::error::OpenAiApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_ORGANIZATION: &str = "OpenAI-Organization";
pub const HEADER_USER_AGENT: &str = "User-Agent";

const ACCEPT_EVENT_STREAM: &str = "text/event-stream";
const ACCEPT_JSON: &str = "application/json";

/// Build a deterministic header map for chat-completions requests.
///
/// `streaming` selects the `accept` value. Extra headers are lower-cased and
/// applied last so they can override defaults.
pub fn build_headers(
    config: &OpenAiApiConfig,
    streaming: bool,
) -> Result<BTreeMap<String, String>, OpenAiApiError> {
    if config.api_key.trim().is_empty() {
        return Err(OpenAiApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_AUTHORIZATION.to_owned(),
        format!("Bearer {}", config.api_key.trim()),
    );
    headers.insert(
        HEADER_ACCEPT.to_owned(),
        if streaming {
            ACCEPT_EVENT_STREAM
        } else {
            ACCEPT_JSON
        }
        .to_owned(),
    );
    headers.insert(HEADER_CONTENT_TYPE.to_owned(), ACCEPT_JSON.to_owned());

    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    if let Some(organization) = config
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        headers.insert(HEADER_ORGANIZATION.to_owned(), organization.to_owned());
    }

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}

fn default_user_agent() -> String {
    format!("aichat/{}", env!("CARGO_PKG_VERSION"))
}
