//! Dismissible notifications attached to view responses.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }

    pub fn sign_in_required(action: &str) -> Self {
        Self::error("Sign in required", format!("Sign in to {action}"))
    }

    pub fn access_denied() -> Self {
        Self::error(
            "Access denied",
            "You do not have permission to view this page",
        )
    }
}

/// "You gave 1 star" / "You gave 4 stars".
pub fn stars_phrase(stars: u8) -> String {
    if stars == 1 {
        "You gave 1 star".to_string()
    } else {
        format!("You gave {stars} stars")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralises_stars() {
        assert_eq!(stars_phrase(1), "You gave 1 star");
        assert_eq!(stars_phrase(5), "You gave 5 stars");
    }

    #[test]
    fn sign_in_notification_is_destructive() {
        let n = Notification::sign_in_required("rate this video");
        assert_eq!(n.variant, Variant::Destructive);
        assert_eq!(n.description, "Sign in to rate this video");
    }
}
