//! Rating aggregation and the per-user rating write path.
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::models::Rating;
use crate::pocketbase::{find_first, list_as, Collection, Filter, ListQuery, PocketBaseApi, MAX_PER_PAGE};
use crate::session::Session;
use crate::upsert::{pair_filter, upsert_unique, KeyedLocks, UniqueWrite, UpsertKind};

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("Rating must be between 1 and 5 stars, got {0}")]
    OutOfRange(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Stars(u8);

impl Stars {
    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (MIN_STARS as i64..=MAX_STARS as i64).contains(&value) {
            Ok(Stars(value as u8))
        } else {
            Err(RatingError::OutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub total: u64,
    pub average: f64,
    /// Always holds keys 1 through 5.
    pub distribution: BTreeMap<u8, u64>,
    pub user_rating: Option<u8>,
}

impl RatingStats {
    pub fn from_ratings(ratings: &[Rating], current_user: Option<&str>) -> Self {
        let mut distribution: BTreeMap<u8, u64> = (MIN_STARS..=MAX_STARS).map(|s| (s, 0)).collect();
        let mut sum: i64 = 0;
        for r in ratings {
            sum += r.rating;
            let bucket = r.rating.clamp(MIN_STARS as i64, MAX_STARS as i64) as u8;
            *distribution.entry(bucket).or_insert(0) += 1;
        }
        let total = ratings.len() as u64;
        let average = if total == 0 {
            0.0
        } else {
            sum as f64 / total as f64
        };
        let user_rating = current_user.and_then(|uid| {
            ratings
                .iter()
                .find(|r| r.user == uid)
                .map(|r| r.rating.clamp(MIN_STARS as i64, MAX_STARS as i64) as u8)
        });
        Self {
            total,
            average,
            distribution,
            user_rating,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub kind: RatingChange,
    pub stars: Stars,
    pub stats: RatingStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingChange {
    Created,
    Updated,
}

impl From<UpsertKind> for RatingChange {
    fn from(kind: UpsertKind) -> Self {
        match kind {
            UpsertKind::Created => RatingChange::Created,
            UpsertKind::Updated => RatingChange::Updated,
        }
    }
}

impl RatingChange {
    pub fn title(&self) -> &'static str {
        match self {
            RatingChange::Created => "Rating added",
            RatingChange::Updated => "Rating updated",
        }
    }
}

/// Re-reads every rating for the video (up to the backend page cap).
pub async fn load_stats(
    api: &dyn PocketBaseApi,
    video_id: &str,
    session: Option<&Session>,
) -> Result<RatingStats> {
    let query = ListQuery::new(1, MAX_PER_PAGE).filter(Filter::eq("video", video_id));
    let token = session.and_then(Session::token);
    let ratings = list_as::<Rating>(api, Collection::Ratings, &query, token)
        .await
        .with_context(|| format!("Failed to load ratings for video {video_id}"))?;
    debug!(video_id, count = ratings.items.len(), "Loaded ratings");
    Ok(RatingStats::from_ratings(
        &ratings.items,
        session.map(|s| s.user.id.as_str()),
    ))
}

pub async fn submit_rating(
    api: &dyn PocketBaseApi,
    locks: &KeyedLocks,
    session: &Session,
    video_id: &str,
    stars: Stars,
) -> Result<RatingOutcome> {
    let write = UniqueWrite::for_pair(
        Collection::Ratings,
        &session.user.id,
        video_id,
        json!({ "video": video_id, "user": session.user.id, "rating": stars.get() }),
    )
    .update_with(json!({ "rating": stars.get() }));
    let (kind, _) = upsert_unique(api, locks, write, session.token())
        .await
        .with_context(|| format!("Failed to save rating for video {video_id}"))?;
    info!(video_id, user_id = %session.user.id, stars = stars.get(), ?kind, "Saved rating");

    let stats = load_stats(api, video_id, Some(session)).await?;
    Ok(RatingOutcome {
        kind: kind.into(),
        stars,
        stats,
    })
}

/// `None` when the user had not rated the video.
pub async fn remove_rating(
    api: &dyn PocketBaseApi,
    session: &Session,
    video_id: &str,
) -> Result<Option<RatingStats>> {
    let existing: Option<Rating> = find_first(
        api,
        Collection::Ratings,
        pair_filter(&session.user.id, video_id),
        session.token(),
    )
    .await?;
    let Some(existing) = existing else {
        return Ok(None);
    };
    api.delete(Collection::Ratings, &existing.id, session.token())
        .await
        .with_context(|| format!("Failed to delete rating {}", existing.id))?;
    info!(video_id, user_id = %session.user.id, "Removed rating");
    load_stats(api, video_id, Some(session)).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user: &str, value: i64) -> Rating {
        Rating {
            id: format!("r-{user}"),
            video: "v1".to_string(),
            user: user.to_string(),
            rating: value,
            created: String::new(),
            updated: String::new(),
        }
    }

    #[test]
    fn empty_list_has_zero_average() {
        let stats = RatingStats::from_ratings(&[], Some("u1"));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.distribution.len(), 5);
        assert!(stats.distribution.values().all(|c| *c == 0));
        assert_eq!(stats.user_rating, None);
    }

    #[test]
    fn aggregates_mean_histogram_and_own_rating() {
        let ratings = vec![rating("u1", 5), rating("u2", 4), rating("u3", 4), rating("u4", 1)];
        let stats = RatingStats::from_ratings(&ratings, Some("u2"));
        assert_eq!(stats.total, 4);
        assert_eq!(stats.average, 3.5);
        assert_eq!(stats.distribution[&4], 2);
        assert_eq!(stats.distribution[&2], 0);
        assert_eq!(stats.distribution.values().sum::<u64>(), 4);
        assert_eq!(stats.user_rating, Some(4));
    }

    #[test]
    fn out_of_range_values_stay_counted() {
        let ratings = vec![rating("u1", 0), rating("u2", 9)];
        let stats = RatingStats::from_ratings(&ratings, None);
        assert_eq!(stats.distribution[&1], 1);
        assert_eq!(stats.distribution[&5], 1);
        assert_eq!(stats.distribution.values().sum::<u64>(), stats.total);
    }

    #[test]
    fn stars_reject_out_of_range() {
        assert_eq!(Stars::new(0), Err(RatingError::OutOfRange(0)));
        assert_eq!(Stars::new(6), Err(RatingError::OutOfRange(6)));
        assert_eq!(Stars::new(3).map(Stars::get), Ok(3));
    }
}
