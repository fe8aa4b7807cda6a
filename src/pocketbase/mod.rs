use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::User;

mod client;
mod error;
mod filter;

pub use client::PocketBaseClient;
pub use error::{ApiError, FieldError};
pub use filter::{Filter, Literal};

/// Upper bound the backend accepts for `perPage`.
pub const MAX_PER_PAGE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Genres,
    Videos,
    Episodes,
    Comments,
    Ratings,
    Favorites,
    WatchHistory,
    Views,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Genres => "genres",
            Collection::Videos => "videos",
            Collection::Episodes => "episodes",
            Collection::Comments => "comments",
            Collection::Ratings => "ratings",
            Collection::Favorites => "favorites",
            Collection::WatchHistory => "watch_history",
            Collection::Views => "views",
        }
    }

    pub const ALL: [Collection; 9] = [
        Collection::Users,
        Collection::Genres,
        Collection::Videos,
        Collection::Episodes,
        Collection::Comments,
        Collection::Ratings,
        Collection::Favorites,
        Collection::WatchHistory,
        Collection::Views,
    ];
}

impl std::str::FromStr for Collection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown collection: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub filter: Option<Filter>,
    pub sort: Option<String>,
    pub expand: Option<String>,
}

impl ListQuery {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            filter: None,
            sort: None,
            expand: None,
        }
    }

    /// Empty expressions are dropped so they never reach the wire.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    pub fn expand(mut self, expand: &str) -> Self {
        self.expand = Some(expand.to_string());
        self
    }

    /// Query-string pairs in the order the backend documents them.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("perPage", self.per_page.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(filter) = &self.filter {
            params.push(("filter", filter.to_string()));
        }
        if let Some(expand) = &self.expand {
            params.push(("expand", expand.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub items: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn empty(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            total_items: 0,
            total_pages: 0,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: User,
}

#[async_trait]
pub trait PocketBaseApi: Send + Sync {
    async fn auth_with_password(&self, identity: &str, password: &str) -> Result<AuthResponse>;
    async fn auth_refresh(&self, token: &str) -> Result<AuthResponse>;
    async fn list(
        &self,
        collection: Collection,
        query: &ListQuery,
        token: Option<&str>,
    ) -> Result<ListResult<Value>>;
    async fn get_one(
        &self,
        collection: Collection,
        id: &str,
        expand: Option<&str>,
        token: Option<&str>,
    ) -> Result<Value>;
    async fn create(&self, collection: Collection, body: Value, token: Option<&str>)
        -> Result<Value>;
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        token: Option<&str>,
    ) -> Result<Value>;
    async fn delete(&self, collection: Collection, id: &str, token: Option<&str>) -> Result<()>;
}

/// The typed backend error behind an `anyhow::Error`, if that is what failed.
pub fn api_error(err: &anyhow::Error) -> Option<&ApiError> {
    err.downcast_ref::<ApiError>()
}

fn decode<T: DeserializeOwned>(collection: Collection, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .with_context(|| format!("Failed to decode {} record", collection.as_str()))
}

pub async fn list_as<T: DeserializeOwned>(
    api: &dyn PocketBaseApi,
    collection: Collection,
    query: &ListQuery,
    token: Option<&str>,
) -> Result<ListResult<T>> {
    let raw = api.list(collection, query, token).await?;
    let items = raw
        .items
        .into_iter()
        .map(|v| decode(collection, v))
        .collect::<Result<Vec<T>>>()?;
    Ok(ListResult {
        page: raw.page,
        per_page: raw.per_page,
        total_items: raw.total_items,
        total_pages: raw.total_pages,
        items,
    })
}

/// First record matching `filter`, if any.
pub async fn find_first<T: DeserializeOwned>(
    api: &dyn PocketBaseApi,
    collection: Collection,
    filter: Filter,
    token: Option<&str>,
) -> Result<Option<T>> {
    let query = ListQuery::new(1, 1).filter(filter);
    let mut found = list_as::<T>(api, collection, &query, token).await?;
    Ok(if found.items.is_empty() {
        None
    } else {
        Some(found.items.remove(0))
    })
}

pub async fn get_as<T: DeserializeOwned>(
    api: &dyn PocketBaseApi,
    collection: Collection,
    id: &str,
    expand: Option<&str>,
    token: Option<&str>,
) -> Result<T> {
    let value = api.get_one(collection, id, expand, token).await?;
    decode(collection, value)
}

pub async fn create_as<T: DeserializeOwned>(
    api: &dyn PocketBaseApi,
    collection: Collection,
    body: Value,
    token: Option<&str>,
) -> Result<T> {
    let value = api.create(collection, body, token).await?;
    decode(collection, value)
}

pub async fn update_as<T: DeserializeOwned>(
    api: &dyn PocketBaseApi,
    collection: Collection,
    id: &str,
    body: Value,
    token: Option<&str>,
) -> Result<T> {
    let value = api.update(collection, id, body, token).await?;
    decode(collection, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_params_skip_empty_filter() {
        let query = ListQuery::new(0, 10_000)
            .filter(Filter::and(Vec::new()))
            .sort("-created")
            .expand("genre");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, MAX_PER_PAGE);
        let params = query.to_params();
        assert!(params.iter().all(|(k, _)| *k != "filter"));
        assert!(params.contains(&("sort", "-created".to_string())));
        assert!(params.contains(&("expand", "genre".to_string())));
    }

    #[test]
    fn parses_collection_names() {
        assert_eq!("watch_history".parse::<Collection>().ok(), Some(Collection::WatchHistory));
        assert_eq!(" Videos ".parse::<Collection>().ok(), Some(Collection::Videos));
        assert!("playlists".parse::<Collection>().is_err());
    }

    #[test]
    fn api_error_survives_context() {
        let err = anyhow::Error::new(ApiError::from_body(404, "{\"message\":\"missing\"}"))
            .context("loading video");
        assert!(api_error(&err).is_some_and(|e| e.is_not_found()));
    }
}
