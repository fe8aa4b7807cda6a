use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::models::Comment;
use crate::pocketbase::{get_as, list_as, Collection, Filter, ListQuery, PocketBaseApi};
use crate::session::Session;

pub const COMMENTS_PER_PAGE: u32 = 50;
pub const MAX_COMMENT_CHARS: usize = 2000;
const COMMENT_EXPAND: &str = "createdBy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommentError {
    #[error("Comment cannot be empty")]
    Empty,
    #[error("Comment is too long (max 2000 characters)")]
    TooLong,
}

/// Trimmed content, ready to post.
pub fn validate(content: &str) -> Result<&str, CommentError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(CommentError::Empty)
    } else if trimmed.chars().count() > MAX_COMMENT_CHARS {
        Err(CommentError::TooLong)
    } else {
        Ok(trimmed)
    }
}

pub async fn list(api: &dyn PocketBaseApi, video_id: &str) -> Result<Vec<Comment>> {
    let query = ListQuery::new(1, COMMENTS_PER_PAGE)
        .filter(Filter::eq("video", video_id))
        .sort("-created")
        .expand(COMMENT_EXPAND);
    let list = list_as::<Comment>(api, Collection::Comments, &query, None)
        .await
        .with_context(|| format!("Failed to load comments for video {video_id}"))?;
    Ok(list.items)
}

/// Creates the comment and re-reads it with the author expanded.
pub async fn post(
    api: &dyn PocketBaseApi,
    session: &Session,
    video_id: &str,
    content: &str,
) -> Result<Comment> {
    let content = validate(content)?;
    let body = json!({
        "content": content,
        "video": video_id,
        "createdBy": session.user.id,
    });
    let created = api
        .create(Collection::Comments, body, session.token())
        .await
        .with_context(|| format!("Failed to post comment on video {video_id}"))?;
    let id = created
        .get("id")
        .and_then(|v| v.as_str())
        .context("Created comment has no id")?;
    info!(video_id, comment_id = id, user_id = %session.user.id, "Posted comment");
    get_as(api, Collection::Comments, id, Some(COMMENT_EXPAND), session.token()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_bounds_content() {
        assert_eq!(validate("  great film \n"), Ok("great film"));
        assert_eq!(validate("   "), Err(CommentError::Empty));
        let long = "a".repeat(MAX_COMMENT_CHARS + 1);
        assert_eq!(validate(&long), Err(CommentError::TooLong));
        let max = "я".repeat(MAX_COMMENT_CHARS);
        assert!(validate(&max).is_ok());
    }
}
