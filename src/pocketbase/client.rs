use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{ApiError, AuthResponse, Collection, ListQuery, ListResult, PocketBaseApi};

#[derive(Debug, Clone)]
pub struct PocketBaseClient {
    client: Client,
    base_url: String,
}

impl PocketBaseClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let user_agent = format!("cinemax/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build PocketBase HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn records_url(&self, collection: Collection) -> String {
        format!(
            "{}/api/collections/{}/records",
            self.base_url,
            collection.as_str()
        )
    }

    fn record_url(&self, collection: Collection, id: &str) -> String {
        format!(
            "{}/{}",
            self.records_url(collection),
            urlencoding::encode(id)
        )
    }

    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        let req = self.client.request(method, url);
        match token {
            Some(t) => req.header(reqwest::header::AUTHORIZATION, t),
            None => req,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let res = req
            .send()
            .await
            .with_context(|| format!("PocketBase {what} request failed"))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("Failed to read PocketBase {what} body"))?;
        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), &text).into());
        }
        serde_json::from_str(&text).with_context(|| format!("Failed to parse PocketBase {what} JSON"))
    }
}

fn encode_query(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl PocketBaseApi for PocketBaseClient {
    async fn auth_with_password(&self, identity: &str, password: &str) -> Result<AuthResponse> {
        let url = format!(
            "{}/api/collections/users/auth-with-password",
            self.base_url
        );
        let req = self
            .request(Method::POST, &url, None)
            .json(&json!({ "identity": identity, "password": password }));
        self.send_json(req, "auth").await
    }

    async fn auth_refresh(&self, token: &str) -> Result<AuthResponse> {
        let url = format!("{}/api/collections/users/auth-refresh", self.base_url);
        let req = self.request(Method::POST, &url, Some(token));
        self.send_json(req, "auth refresh").await
    }

    async fn list(
        &self,
        collection: Collection,
        query: &ListQuery,
        token: Option<&str>,
    ) -> Result<ListResult<Value>> {
        let url = format!(
            "{}?{}",
            self.records_url(collection),
            encode_query(&query.to_params())
        );
        debug!(collection = collection.as_str(), url = %url, "Listing records");
        let req = self.request(Method::GET, &url, token);
        self.send_json(req, "list").await
    }

    async fn get_one(
        &self,
        collection: Collection,
        id: &str,
        expand: Option<&str>,
        token: Option<&str>,
    ) -> Result<Value> {
        let mut url = self.record_url(collection, id);
        if let Some(expand) = expand {
            url.push('?');
            url.push_str(&encode_query(&[("expand", expand.to_string())]));
        }
        let req = self.request(Method::GET, &url, token);
        self.send_json(req, "view").await
    }

    async fn create(
        &self,
        collection: Collection,
        body: Value,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = self.records_url(collection);
        let req = self.request(Method::POST, &url, token).json(&body);
        self.send_json(req, "create").await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = self.record_url(collection, id);
        let req = self.request(Method::PATCH, &url, token).json(&body);
        self.send_json(req, "update").await
    }

    async fn delete(&self, collection: Collection, id: &str, token: Option<&str>) -> Result<()> {
        let url = self.record_url(collection, id);
        let res = self
            .request(Method::DELETE, &url, token)
            .send()
            .await
            .context("PocketBase delete request failed")?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::from_body(status.as_u16(), &text).into());
        }
        Ok(())
    }
}
