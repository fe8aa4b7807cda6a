use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

/// Film or series. The backend schema spells the series value `serias`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "serias", alias = "series")]
    Series,
}

impl VideoKind {
    pub fn as_wire(&self) -> &'static str {
        match self {
            VideoKind::Movie => "movie",
            VideoKind::Series => "serias",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" => Some(VideoKind::Movie),
            "serias" | "series" | "tv" => Some(VideoKind::Series),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoExpand {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genre: Vec<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub video_file: Option<String>,
    #[serde(default)]
    pub video_source_url: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<VideoExpand>,
}

impl Video {
    pub fn is_series(&self) -> bool {
        self.kind == VideoKind::Series
    }

    /// Expanded genre records, falling back to nothing when not expanded.
    pub fn genres(&self) -> &[Genre] {
        self.expand
            .as_ref()
            .map(|e| e.genre.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub video: String,
    pub season: u32,
    pub episode_number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub video_file: Option<String>,
    #[serde(default)]
    pub video_source_url: Option<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: String,
    pub video: String,
    pub user: String,
    pub rating: i64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub video: String,
    pub user: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<VideoRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHistory {
    pub id: String,
    pub video: String,
    pub user: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<VideoRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentExpand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub video: String,
    pub created_by: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<CommentExpand>,
}

/// One playback start; `session` is the epoch-millis stamp of the visit, as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub video: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<String>,
    pub user: String,
    pub session: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn video_kind_reads_backend_spelling() {
        let video: Video = serde_json::from_value(json!({
            "id": "v1",
            "title": "Ascension",
            "type": "serias",
            "genre": ["g1"],
            "videoSourceUrl": "https://cdn/v1.m3u8",
            "expand": { "genre": [{ "id": "g1", "title": "Drama" }] }
        }))
        .expect("video decodes");
        assert!(video.is_series());
        assert_eq!(video.genres()[0].title, "Drama");
        assert_eq!(video.video_source_url.as_deref(), Some("https://cdn/v1.m3u8"));
        let out = serde_json::to_value(&video).expect("video encodes");
        assert_eq!(out["type"], "serias");
    }

    #[test]
    fn admin_flag_comes_from_role() {
        let mut user: User =
            serde_json::from_value(json!({"id": "u1", "username": "neo"})).expect("user decodes");
        assert!(!user.is_admin());
        assert_eq!(user.display_name(), "neo");
        user.role = Some("admin".to_string());
        assert!(user.is_admin());
    }
}
