//! Owner credential resolution via the OAuth refresh-token flow.
//!
//! Tokens live on the Owner record. A still-valid access token is used
//! as is; an expired one is exchanged for a fresh token at the
//! configured endpoint and the rotated credential is persisted. Any
//! failure degrades to an unauthenticated fetch rather than failing the
//! refresh.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use relay_core::error::RelayResult;
use relay_core::identity::OwnerId;
use relay_core::owner::Owner;
use relay_engine::CredentialProvider;
use relay_storage::datastore::Datastore;

use crate::config::OAuthConfig;

pub struct OAuthCredentialProvider {
    store: Arc<dyn Datastore>,
    config: Option<OAuthConfig>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl OAuthCredentialProvider {
    pub fn new(store: Arc<dyn Datastore>, config: Option<OAuthConfig>) -> Self {
        Self {
            store,
            config,
            client: Client::new(),
        }
    }

    async fn refresh(&self, owner: &mut Owner) -> Option<String> {
        let config = self.config.as_ref()?;
        let refresh_token = owner.refresh_token.clone()?;

        let response = self
            .client
            .post(&config.token_endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
            ])
            .send()
            .await;

        let token: TokenResponse = match response {
            Ok(resp) => match resp.json().await {
                Ok(token) => token,
                Err(e) => {
                    warn!(owner_id = %owner.id, error = %e, "token response was not decodable");
                    return None;
                }
            },
            Err(e) => {
                warn!(owner_id = %owner.id, error = %e, "token refresh request failed");
                return None;
            }
        };

        owner.access_token = Some(token.access_token.clone());
        owner.token_expiry = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Some(token.access_token)
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn access_token(&self, owner_id: OwnerId) -> RelayResult<Option<String>> {
        let Some(mut owner) = self.store.owner_get(owner_id).await? else {
            return Ok(None);
        };

        if owner.token_valid_at(Utc::now()) {
            return Ok(owner.access_token);
        }

        let Some(token) = self.refresh(&mut owner).await else {
            return Ok(None);
        };
        self.store.owner_put(&owner).await?;
        Ok(Some(token))
    }
}
