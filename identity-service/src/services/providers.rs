//! OAuth2 provider registry.
//!
//! Providers are configured independently through environment variables; a
//! provider whose credentials are absent is simply left out of the registry.
//! "Provider unavailable" is a normal runtime state, not a startup failure.

use std::collections::HashMap;
use std::env;

use crate::models::OAuth2Provider;
use crate::services::AuthError;

pub struct ProviderRegistry {
    providers: HashMap<String, OAuth2Provider>,
}

impl ProviderRegistry {
    /// Load every provider whose client id/secret pair is present in the
    /// environment. `api_url` is this service's public base URL, used to
    /// build callback redirect URIs.
    pub fn from_env(api_url: &str) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
        };

        for definition in provider_definitions(api_url) {
            let (name, build) = definition;
            let id_var = format!("{}_CLIENT_ID", name.to_uppercase());
            let secret_var = format!("{}_CLIENT_SECRET", name.to_uppercase());

            match (env::var(&id_var), env::var(&secret_var)) {
                (Ok(client_id), Ok(client_secret)) => {
                    registry.insert(build(client_id, client_secret));
                }
                _ => {
                    tracing::warn!(
                        provider = name,
                        "OAuth2 provider not configured: missing client id or secret"
                    );
                }
            }
        }

        if registry.providers.is_empty() {
            tracing::warn!("No OAuth2 providers configured; OAuth sign-in is unavailable");
        } else {
            let mut names: Vec<&str> = registry.providers.keys().map(String::as_str).collect();
            names.sort_unstable();
            tracing::info!(providers = names.join(","), "OAuth2 providers initialized");
        }

        registry
    }

    /// Registry with no providers, for tests that add their own.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, provider: OAuth2Provider) {
        self.providers.insert(provider.name.clone(), provider);
    }

    pub fn get(&self, name: &str) -> Result<&OAuth2Provider, AuthError> {
        let provider = self
            .providers
            .get(&name.to_lowercase())
            .ok_or_else(|| AuthError::ProviderNotConfigured(name.to_string()))?;

        if !provider.active {
            return Err(AuthError::ProviderInactive(name.to_string()));
        }

        Ok(provider)
    }

    /// Names of the active providers, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .values()
            .filter(|p| p.active)
            .map(|p| p.name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Build the provider's authorize URL with `response_type=code` and an
    /// optional CSRF `state`.
    pub fn authorization_url(&self, name: &str, state: Option<&str>) -> Result<String, AuthError> {
        let provider = self.get(name)?;

        let mut url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
            provider.authorize_url,
            urlencoding::encode(&provider.client_id),
            urlencoding::encode(&provider.redirect_uri),
            urlencoding::encode(&provider.scope),
        );

        if let Some(state) = state {
            url.push_str("&state=");
            url.push_str(&urlencoding::encode(state));
        }

        Ok(url)
    }
}

type ProviderBuilder = Box<dyn Fn(String, String) -> OAuth2Provider>;

fn provider_definitions(api_url: &str) -> Vec<(&'static str, ProviderBuilder)> {
    let redirect = |api_url: &str, name: &str| format!("{}/auth/oauth/{}/callback", api_url, name);

    let google_redirect = redirect(api_url, "google");
    let facebook_redirect = redirect(api_url, "facebook");
    let github_redirect = redirect(api_url, "github");
    let microsoft_redirect = redirect(api_url, "microsoft");

    vec![
        (
            "google",
            Box::new(move |client_id, client_secret| OAuth2Provider {
                name: "google".to_string(),
                client_id,
                client_secret,
                authorize_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
                emails_url: None,
                redirect_uri: google_redirect.clone(),
                scope: "openid email profile".to_string(),
                id_field: "sub".to_string(),
                email_field: "email".to_string(),
                name_field: "name".to_string(),
                active: true,
            }),
        ),
        (
            "facebook",
            Box::new(move |client_id, client_secret| OAuth2Provider {
                name: "facebook".to_string(),
                client_id,
                client_secret,
                authorize_url: "https://www.facebook.com/v13.0/dialog/oauth".to_string(),
                token_url: "https://graph.facebook.com/v13.0/oauth/access_token".to_string(),
                userinfo_url: "https://graph.facebook.com/me?fields=id,name,email,picture"
                    .to_string(),
                emails_url: None,
                redirect_uri: facebook_redirect.clone(),
                scope: "email public_profile".to_string(),
                id_field: "id".to_string(),
                email_field: "email".to_string(),
                name_field: "name".to_string(),
                active: true,
            }),
        ),
        (
            "github",
            Box::new(move |client_id, client_secret| OAuth2Provider {
                name: "github".to_string(),
                client_id,
                client_secret,
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                userinfo_url: "https://api.github.com/user".to_string(),
                emails_url: Some("https://api.github.com/user/emails".to_string()),
                redirect_uri: github_redirect.clone(),
                scope: "read:user user:email".to_string(),
                id_field: "id".to_string(),
                email_field: "email".to_string(),
                name_field: "name".to_string(),
                active: true,
            }),
        ),
        (
            "microsoft",
            Box::new(move |client_id, client_secret| OAuth2Provider {
                name: "microsoft".to_string(),
                client_id,
                client_secret,
                authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                    .to_string(),
                token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                    .to_string(),
                userinfo_url: "https://graph.microsoft.com/v1.0/me".to_string(),
                emails_url: None,
                redirect_uri: microsoft_redirect.clone(),
                scope: "openid email profile User.Read".to_string(),
                id_field: "id".to_string(),
                email_field: "userPrincipalName".to_string(),
                name_field: "displayName".to_string(),
                active: true,
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider(name: &str, active: bool) -> OAuth2Provider {
        OAuth2Provider {
            name: name.to_string(),
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            authorize_url: "https://provider.example/authorize".to_string(),
            token_url: "https://provider.example/token".to_string(),
            userinfo_url: "https://provider.example/userinfo".to_string(),
            emails_url: None,
            redirect_uri: "http://localhost:8080/auth/oauth/test/callback".to_string(),
            scope: "openid email".to_string(),
            id_field: "sub".to_string(),
            email_field: "email".to_string(),
            name_field: "name".to_string(),
            active,
        }
    }

    #[test]
    fn unknown_provider_is_not_configured() {
        let registry = ProviderRegistry::empty();
        assert!(matches!(
            registry.get("google"),
            Err(AuthError::ProviderNotConfigured(_))
        ));
    }

    #[test]
    fn inactive_provider_is_rejected() {
        let mut registry = ProviderRegistry::empty();
        registry.insert(test_provider("test", false));
        assert!(matches!(
            registry.get("test"),
            Err(AuthError::ProviderInactive(_))
        ));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut registry = ProviderRegistry::empty();
        registry.insert(test_provider("test", true));
        assert!(registry.get("TeSt").is_ok());
    }

    #[test]
    fn authorization_url_carries_code_flow_params() {
        let mut registry = ProviderRegistry::empty();
        registry.insert(test_provider("test", true));

        let url = registry
            .authorization_url("test", Some("state with spaces"))
            .unwrap();

        assert!(url.starts_with("https://provider.example/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Foauth%2Ftest%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email"));
        assert!(url.contains("state=state%20with%20spaces"));
    }

    #[test]
    fn authorization_url_omits_absent_state() {
        let mut registry = ProviderRegistry::empty();
        registry.insert(test_provider("test", true));

        let url = registry.authorization_url("test", None).unwrap();
        assert!(!url.contains("state="));
    }
}
