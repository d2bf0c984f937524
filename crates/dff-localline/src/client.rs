//! HTTP client for the LocalLine backoffice REST API.
//!
//! Wraps `reqwest` with bearer-token handling and typed (de)serialization.
//! Calls are never retried; a failed call surfaces as a [`LocalLineError`]
//! and the caller decides whether the run continues.

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::LocalLineError;
use crate::types::{AccessToken, ProductPackagesPatch, ProductUpdate, RemoteProduct, TokenRequest};

/// Client for the LocalLine backoffice API.
///
/// Use [`LocalLineClient::from_app_config`] in the binaries or
/// [`LocalLineClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct LocalLineClient {
    client: Client,
    base_url: Url,
    /// Storefront URL sent as `Referer`/`Origin` on package price patches.
    company_base_url: Option<String>,
}

impl LocalLineClient {
    /// Creates a client from the loaded application config.
    ///
    /// # Errors
    ///
    /// See [`LocalLineClient::with_base_url`].
    pub fn from_app_config(config: &dff_core::AppConfig) -> Result<Self, LocalLineError> {
        Self::with_base_url(
            &config.ll_base_url,
            config.request_timeout_secs,
            config.ll_company_base_url.as_deref(),
        )
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`LocalLineError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`LocalLineError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        company_base_url: Option<&str>,
    ) -> Result<Self, LocalLineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("dff/0.1 (price-sync)")
            .build()?;

        // Relative joins drop the last path segment unless the base ends in '/'.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| LocalLineError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
            company_base_url: company_base_url.map(ToOwned::to_owned),
        })
    }

    /// Exchanges credentials for an access token (`POST token`).
    ///
    /// # Errors
    ///
    /// - [`LocalLineError::Http`] on network failure.
    /// - [`LocalLineError::UnexpectedStatus`] if the credentials are rejected.
    /// - [`LocalLineError::Deserialize`] if the body has no `access` field.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, LocalLineError> {
        let url = self.endpoint("token")?;
        let request = self
            .client
            .post(url.clone())
            .json(&TokenRequest { username, password });
        Self::send_json(request, &url, "token").await
    }

    /// Fetches one product with its packages and price-list entries.
    ///
    /// # Errors
    ///
    /// - [`LocalLineError::Http`] on network failure.
    /// - [`LocalLineError::UnexpectedStatus`] on a non-2xx status.
    /// - [`LocalLineError::Deserialize`] if the body is not a product.
    pub async fn get_product(
        &self,
        token: &AccessToken,
        product_id: i64,
    ) -> Result<RemoteProduct, LocalLineError> {
        let url = self.product_url(product_id)?;
        let request = self.client.get(url.clone()).bearer_auth(token.as_str());
        Self::send_json(request, &url, &format!("get_product(id={product_id})"))
            .await
    }

    /// Applies a package price patch (`PATCH products/{id}/?expand=vendor`).
    ///
    /// # Errors
    ///
    /// - [`LocalLineError::Http`] on network failure.
    /// - [`LocalLineError::UnexpectedStatus`] on a non-2xx status.
    pub async fn apply_package_update(
        &self,
        token: &AccessToken,
        product_id: i64,
        patch: &ProductPackagesPatch,
    ) -> Result<(), LocalLineError> {
        let mut url = self.product_url(product_id)?;
        url.query_pairs_mut().append_pair("expand", "vendor");

        let mut request = self
            .client
            .patch(url.clone())
            .bearer_auth(token.as_str())
            .json(patch);
        if let Some(company) = &self.company_base_url {
            request = request
                .header(header::REFERER, company)
                .header(header::ORIGIN, company);
        }

        tracing::debug!(product_id, "patching package prices");
        Self::send(request, &url).await
    }

    /// Patches visibility, inventory and naming fields
    /// (`PATCH products/{id}/`).
    ///
    /// # Errors
    ///
    /// - [`LocalLineError::Http`] on network failure.
    /// - [`LocalLineError::UnexpectedStatus`] on a non-2xx status.
    pub async fn update_product(
        &self,
        token: &AccessToken,
        product_id: i64,
        update: &ProductUpdate,
    ) -> Result<(), LocalLineError> {
        let url = self.product_url(product_id)?;
        let request = self
            .client
            .patch(url.clone())
            .bearer_auth(token.as_str())
            .json(update);
        tracing::debug!(product_id, "patching product inventory fields");
        Self::send(request, &url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, LocalLineError> {
        self.base_url
            .join(path)
            .map_err(|e| LocalLineError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    fn product_url(&self, product_id: i64) -> Result<Url, LocalLineError> {
        self.endpoint(&format!("products/{product_id}/"))
    }

    /// Sends `request` and maps a non-2xx status to
    /// [`LocalLineError::UnexpectedStatus`], keeping the body for the log.
    async fn send(request: RequestBuilder, url: &Url) -> Result<(), LocalLineError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(LocalLineError::UnexpectedStatus {
            status: status.as_u16(),
            url: redact_query(url),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
        url: &Url,
        context: &str,
    ) -> Result<T, LocalLineError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LocalLineError::UnexpectedStatus {
                status: status.as_u16(),
                url: redact_query(url),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| LocalLineError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

fn redact_query(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
