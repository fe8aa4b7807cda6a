use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Video, VideoKind};
use crate::pocketbase::{list_as, Collection, Filter, ListQuery, ListResult, PocketBaseApi};

pub const MOVIES_PER_PAGE: u32 = 12;
pub const SERIES_PER_PAGE: u32 = 50;
pub const SEARCH_PER_PAGE: u32 = 20;
pub const YEAR_OPTIONS: usize = 25;

const CATALOG_EXPAND: &str = "genre,createdBy";

/// Raw query-string parameters as the catalog pages send them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub query: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub kind: Option<VideoKind>,
}

fn selected(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

impl SearchFilters {
    pub fn from_params(params: &SearchParams) -> Self {
        let year = selected(params.year.as_deref()).and_then(|y| match y.parse::<i32>() {
            Ok(y) => Some(y),
            Err(_) => {
                warn!(year = %y, "Ignoring unparsable year filter");
                None
            }
        });
        let kind = selected(params.kind.as_deref()).and_then(|k| {
            let parsed = VideoKind::parse(&k);
            if parsed.is_none() {
                warn!(kind = %k, "Ignoring unknown type filter");
            }
            parsed
        });
        Self {
            query: selected(params.q.as_deref()),
            genre: selected(params.genre.as_deref()),
            year,
            kind,
        }
    }

    /// Absent selections contribute no clause; no selections at all yields
    /// the empty expression.
    pub fn to_filter(&self) -> Filter {
        let mut parts = Vec::new();
        if let Some(q) = &self.query {
            parts.push(Filter::or([
                Filter::contains("title", q.as_str()),
                Filter::contains("description", q.as_str()),
            ]));
        }
        if let Some(genre) = &self.genre {
            parts.push(Filter::contains("genre", genre.as_str()));
        }
        if let Some(year) = self.year {
            parts.push(Filter::eq("year", year));
        }
        if let Some(kind) = self.kind {
            parts.push(Filter::eq("type", kind.as_wire()));
        }
        Filter::and(parts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSort {
    #[default]
    Newest,
    Title,
    Year,
}

impl CatalogSort {
    pub fn parse(input: Option<&str>) -> Self {
        match input.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("title") => CatalogSort::Title,
            Some("year") => CatalogSort::Year,
            _ => CatalogSort::Newest,
        }
    }

    pub fn as_sort(&self) -> &'static str {
        match self {
            CatalogSort::Newest => "-created",
            CatalogSort::Title => "title",
            CatalogSort::Year => "-year",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub items: Vec<Video>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl From<ListResult<Video>> for CatalogPage {
    fn from(list: ListResult<Video>) -> Self {
        Self {
            items: list.items,
            page: list.page,
            total_pages: list.total_pages,
            total_items: list.total_items,
        }
    }
}

async fn fetch(api: &dyn PocketBaseApi, query: ListQuery, what: &str) -> Result<CatalogPage> {
    debug!(what, filter = ?query.filter.as_ref().map(|f| f.to_string()), "Fetching catalog page");
    let list = list_as::<Video>(api, Collection::Videos, &query, None)
        .await
        .with_context(|| format!("Failed to load {what}"))?;
    Ok(list.into())
}

pub async fn movies_page(
    api: &dyn PocketBaseApi,
    filters: &SearchFilters,
    sort: CatalogSort,
    page: u32,
) -> Result<CatalogPage> {
    let filters = SearchFilters {
        kind: Some(VideoKind::Movie),
        ..filters.clone()
    };
    let query = ListQuery::new(page, MOVIES_PER_PAGE)
        .filter(filters.to_filter())
        .sort(sort.as_sort())
        .expand(CATALOG_EXPAND);
    fetch(api, query, "movies").await
}

pub async fn series_page(
    api: &dyn PocketBaseApi,
    filters: &SearchFilters,
    page: u32,
) -> Result<CatalogPage> {
    let filters = SearchFilters {
        kind: Some(VideoKind::Series),
        ..filters.clone()
    };
    let query = ListQuery::new(page, SERIES_PER_PAGE)
        .filter(filters.to_filter())
        .sort("-created")
        .expand(CATALOG_EXPAND);
    fetch(api, query, "series").await
}

pub async fn search_page(
    api: &dyn PocketBaseApi,
    filters: &SearchFilters,
    page: u32,
) -> Result<CatalogPage> {
    let query = ListQuery::new(page, SEARCH_PER_PAGE)
        .filter(filters.to_filter())
        .sort("-created")
        .expand("genre");
    fetch(api, query, "search results").await
}

/// The most recent years, newest first.
pub fn year_options(today: NaiveDate) -> Vec<i32> {
    let current = today.year();
    (0..YEAR_OPTIONS as i32).map(|i| current - i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: &str, genre: &str, year: &str, kind: &str) -> SearchParams {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        SearchParams {
            q: opt(q),
            genre: opt(genre),
            year: opt(year),
            kind: opt(kind),
            ..SearchParams::default()
        }
    }

    #[test]
    fn builds_query_genre_and_year_without_type() {
        let filters = SearchFilters::from_params(&params("x", "g1", "2020", ""));
        assert_eq!(filters.kind, None);
        assert_eq!(
            filters.to_filter().to_string(),
            r#"(title ~ "x" || description ~ "x") && genre ~ "g1" && year = 2020"#
        );
    }

    #[test]
    fn sentinels_and_blanks_mean_absent() {
        let filters = SearchFilters::from_params(&params("  ", "all", "all", "all"));
        assert_eq!(filters, SearchFilters::default());
        assert!(filters.to_filter().is_empty());
        assert_eq!(filters.to_filter().to_string(), "");
    }

    #[test]
    fn bad_year_is_dropped_and_series_uses_wire_name() {
        let filters = SearchFilters::from_params(&params("", "", "soon", "series"));
        assert_eq!(filters.year, None);
        assert_eq!(filters.to_filter().to_string(), r#"type = "serias""#);
    }

    #[test]
    fn sort_options_map_to_backend_sort() {
        assert_eq!(CatalogSort::parse(Some("title")).as_sort(), "title");
        assert_eq!(CatalogSort::parse(Some("year")).as_sort(), "-year");
        assert_eq!(CatalogSort::parse(None).as_sort(), "-created");
        assert_eq!(CatalogSort::parse(Some("bogus")), CatalogSort::Newest);
    }

    #[test]
    fn year_options_count_down_from_current_year() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
        let years = year_options(today);
        assert_eq!(years.len(), 25);
        assert_eq!(years.first(), Some(&2024));
        assert_eq!(years.last(), Some(&2000));
    }
}
