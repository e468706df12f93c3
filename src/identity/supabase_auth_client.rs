use crate::configuration::SupabaseSettings;
use crate::domain::{BearerToken, UserEmail};
use crate::identity::{IdentifiedUser, IdentityProvider};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

pub struct SupabaseAuthClient {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
}

impl SupabaseAuthClient {
    pub fn new(settings: &SupabaseSettings) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: Secret::new(settings.api_key.expose_secret().clone()),
        })
    }
}

#[derive(serde::Deserialize)]
struct AuthUser {
    id: Uuid,
    email: Option<String>,
}

impl TryFrom<AuthUser> for IdentifiedUser {
    type Error = anyhow::Error;

    fn try_from(user: AuthUser) -> Result<Self, Self::Error> {
        let email = user
            .email
            .filter(|email| !email.trim().is_empty())
            .context("User not authenticated or email not available.")?;
        let email = UserEmail::parse(email).map_err(|e| anyhow!(e))?;
        Ok(IdentifiedUser {
            user_id: user.id,
            email,
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    #[tracing::instrument(name = "Resolve user from access token", skip(self, token))]
    async fn get_user(&self, token: &BearerToken) -> Result<IdentifiedUser, anyhow::Error> {
        let response = self
            .http_client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .context("Failed to reach the authentication service.")?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(anyhow!("Invalid or expired access token."));
        }
        if !status.is_success() {
            return Err(anyhow!(
                "The authentication service answered with status {}.",
                status
            ));
        }

        let user: AuthUser = response
            .json()
            .await
            .context("Failed to decode the authenticated user.")?;
        user.try_into()
    }
}
