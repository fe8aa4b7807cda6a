use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::models::Episode;
use crate::pocketbase::{list_as, Collection, Filter, ListQuery, PocketBaseApi};

pub const MAX_EPISODES: u32 = 100;

/// Season number -> episodes, keeping the order they arrived in.
pub fn group_by_season(episodes: Vec<Episode>) -> BTreeMap<u32, Vec<Episode>> {
    let mut seasons: BTreeMap<u32, Vec<Episode>> = BTreeMap::new();
    for ep in episodes {
        seasons.entry(ep.season).or_default().push(ep);
    }
    seasons
}

/// The requested episode, or the first one when nothing was requested.
pub fn select_current<'a>(episodes: &'a [Episode], requested: Option<&str>) -> Option<&'a Episode> {
    match requested {
        Some(id) => episodes.iter().find(|e| e.id == id),
        None => episodes.first(),
    }
}

pub async fn series_episodes(api: &dyn PocketBaseApi, series_id: &str) -> Result<Vec<Episode>> {
    let query = ListQuery::new(1, MAX_EPISODES)
        .filter(Filter::eq("video", series_id))
        .sort("season,episodeNumber");
    let list = list_as::<Episode>(api, Collection::Episodes, &query, None)
        .await
        .with_context(|| format!("Failed to load episodes for series {series_id}"))?;
    Ok(list.items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(id: &str, season: u32, number: u32) -> Episode {
        Episode {
            id: id.to_string(),
            video: "s1".to_string(),
            season,
            episode_number: number,
            title: format!("Episode {number}"),
            thumbnail: None,
            video_file: None,
            video_source_url: None,
            created: String::new(),
            updated: String::new(),
        }
    }

    #[test]
    fn groups_seasons_in_input_order() {
        let grouped = group_by_season(vec![ep("a", 1, 1), ep("b", 1, 2), ep("c", 2, 1)]);
        assert_eq!(grouped.len(), 2);
        let first: Vec<&str> = grouped[&1].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(grouped[&2].len(), 1);

        let json = serde_json::to_value(&grouped).expect("grouping serialises");
        assert!(json.get("1").is_some());
        assert!(json.get("2").is_some());
    }

    #[test]
    fn does_not_reorder_within_a_season() {
        let grouped = group_by_season(vec![ep("late", 1, 5), ep("early", 1, 1)]);
        assert_eq!(grouped[&1][0].id, "late");
    }

    #[test]
    fn selects_requested_or_first_episode() {
        let episodes = vec![ep("a", 1, 1), ep("b", 1, 2)];
        assert_eq!(select_current(&episodes, None).map(|e| e.id.as_str()), Some("a"));
        assert_eq!(select_current(&episodes, Some("b")).map(|e| e.id.as_str()), Some("b"));
        assert!(select_current(&episodes, Some("zzz")).is_none());
        assert!(select_current(&[], None).is_none());
    }
}
