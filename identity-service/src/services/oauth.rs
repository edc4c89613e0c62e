//! Authorization-code exchange and userinfo fetching.
//!
//! Every outbound call runs on a shared reqwest client with a 10 second
//! timeout. A transport error or non-2xx response is terminal for the
//! current callback; there are no retries.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{OAuth2Provider, OAuthUserInfo};
use crate::services::{AuthError, ProviderRegistry};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT_VALUE: &str = concat!("identity-service/", env!("CARGO_PKG_VERSION"));

/// Token endpoint response, normalized to a field map regardless of whether
/// the provider answered with JSON or form encoding.
#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    pub token_type: String,
    pub raw: Map<String, Value>,
}

#[derive(Clone)]
pub struct OAuth2Exchanger {
    registry: Arc<ProviderRegistry>,
    http: reqwest::Client,
}

impl OAuth2Exchanger {
    pub fn new(registry: Arc<ProviderRegistry>) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { registry, http })
    }

    /// Exchange an authorization code for provider tokens.
    pub async fn exchange_code(
        &self,
        provider_name: &str,
        code: &str,
    ) -> Result<ProviderTokens, AuthError> {
        let provider = self.registry.get(provider_name)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", provider.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&provider.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::TokenExchangeFailed(format!(
                "{} from token endpoint: {}",
                status, body
            )));
        }

        let fields = parse_token_response(content_type.as_deref(), &body)
            .map_err(AuthError::TokenExchangeFailed)?;

        let access_token = fields
            .get("access_token")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AuthError::TokenExchangeFailed("response has no access_token".to_string())
            })?;

        let token_type = fields
            .get("token_type")
            .and_then(Value::as_str)
            .unwrap_or("Bearer")
            .to_string();

        Ok(ProviderTokens {
            access_token,
            token_type,
            raw: fields,
        })
    }

    /// Fetch and normalize the user's profile from the provider.
    pub async fn fetch_user_info(
        &self,
        provider_name: &str,
        tokens: &ProviderTokens,
    ) -> Result<OAuthUserInfo, AuthError> {
        let provider = self.registry.get(provider_name)?;
        let auth_header = format!("{} {}", tokens.token_type, tokens.access_token);

        let mut data = self
            .get_json(&provider.userinfo_url, &auth_header)
            .await
            .map_err(AuthError::UserInfoFetchFailed)?;

        // GitHub-class providers omit email from the primary profile; ask the
        // dedicated emails endpoint and take the entry marked primary.
        if field_as_string(&data, &provider.email_field).is_none() {
            if let Some(emails_url) = provider.emails_url.as_deref() {
                match self.get_json_value(emails_url, &auth_header).await {
                    Ok(listing) => {
                        if let Some(email) = pick_primary_email(&listing) {
                            data.insert(provider.email_field.clone(), Value::String(email));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            provider = provider_name,
                            error = %e,
                            "Secondary emails lookup failed"
                        );
                    }
                }
            }
        }

        let provider_user_id = field_as_string(&data, &provider.id_field).ok_or_else(|| {
            AuthError::UserInfoFetchFailed(format!(
                "userinfo response has no '{}' field",
                provider.id_field
            ))
        })?;

        Ok(OAuthUserInfo {
            provider: provider.name.clone(),
            provider_user_id,
            email: field_as_string(&data, &provider.email_field),
            name: field_as_string(&data, &provider.name_field),
            picture: extract_picture(provider, &data),
            raw: data,
        })
    }

    async fn get_json(&self, url: &str, auth_header: &str) -> Result<Map<String, Value>, String> {
        match self.get_json_value(url, auth_header).await? {
            Value::Object(map) => Ok(map),
            other => Err(format!("expected JSON object, got {}", json_kind(&other))),
        }
    }

    async fn get_json_value(&self, url: &str, auth_header: &str) -> Result<Value, String> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, auth_header)
            .header(ACCEPT, "application/json")
            // GitHub rejects requests without a User-Agent
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(format!("{} from {}: {}", status, url, body));
        }

        serde_json::from_str(&body).map_err(|e| e.to_string())
    }
}

/// Parse a token-endpoint response body. Providers normally answer JSON, but
/// GitHub-class endpoints reply `application/x-www-form-urlencoded` even when
/// asked for JSON, so the content type decides the parser.
fn parse_token_response(content_type: Option<&str>, body: &str) -> Result<Map<String, Value>, String> {
    let is_json = content_type
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if is_json {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(format!(
                "expected JSON object from token endpoint, got {}",
                json_kind(&other)
            )),
            Err(e) => Err(format!("malformed JSON from token endpoint: {}", e)),
        }
    } else {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(body).map_err(|e| e.to_string())?;
        Ok(pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect())
    }
}

/// Select the address marked `primary` from a provider emails listing.
fn pick_primary_email(listing: &Value) -> Option<String> {
    let entries = listing.as_array()?;
    entries
        .iter()
        .find(|entry| entry.get("primary").and_then(Value::as_bool).unwrap_or(false))
        .and_then(|entry| entry.get("email"))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Avatar extraction is provider-specific: a direct field, a nested
/// `picture.data.url`, or nothing at all. Absence is never an error.
fn extract_picture(provider: &OAuth2Provider, data: &Map<String, Value>) -> Option<String> {
    match provider.name.as_str() {
        "google" => data.get("picture").and_then(Value::as_str).map(String::from),
        "facebook" => data
            .get("picture")
            .and_then(|p| p.get("data"))
            .and_then(|d| d.get("url"))
            .and_then(Value::as_str)
            .map(String::from),
        "github" => data
            .get("avatar_url")
            .and_then(Value::as_str)
            .map(String::from),
        // Microsoft Graph needs a separate photo API call
        _ => None,
    }
}

/// Read a field as a string, accepting numeric ids (GitHub returns numbers).
fn field_as_string(data: &Map<String, Value>, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
