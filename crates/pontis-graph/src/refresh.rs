// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-lived token exchange for the credential refresher.

use serde::Deserialize;

use pontis_core::PontisError;

use crate::send::{map_send_error, truncate, GraphClient};

/// Result of a successful exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    /// Lifetime in seconds; the provider sometimes omits it.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl GraphClient {
    /// Exchange a connection's token for a fresh long-lived one.
    pub async fn exchange_long_lived_token(
        &self,
        client_id: &str,
        client_secret: &str,
        current_token: &str,
    ) -> Result<TokenExchange, PontisError> {
        let url = format!("{}/oauth/access_token", self.base_url());
        let response = self
            .http()
            .get(&url)
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("fb_exchange_token", current_token),
            ])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| map_send_error(e, std::time::Duration::from_secs(10)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PontisError::Upstream {
                status: status.as_u16(),
                message: truncate(&body, 512),
            });
        }

        response.json().await.map_err(|e| PontisError::Network {
            message: format!("failed to parse token exchange response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}
