//! Page routing table and the access guard in front of it.
use serde::Serialize;

use crate::models::User;

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "page", rename_all = "camelCase")]
pub enum Route {
    Home,
    Movies,
    Series,
    Genres,
    Search,
    Profile,
    Favorites,
    History,
    Watch { id: String },
    WatchEpisode { id: String, episode_id: String },
    Login,
    Register,
    Admin { rest: String },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Access {
    Public,
    SignedIn,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum AccessDecision {
    Allowed,
    SignInRequired { redirect: String },
    Denied,
}

impl Route {
    /// Query strings and fragments are ignored; trailing slashes are not
    /// significant.
    pub fn resolve(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["movies"] => Route::Movies,
            ["series"] => Route::Series,
            ["genres"] => Route::Genres,
            ["search"] => Route::Search,
            ["profile"] => Route::Profile,
            ["favorites"] => Route::Favorites,
            ["history"] => Route::History,
            ["watch", id] => Route::Watch { id: id.to_string() },
            ["watch", id, "episode", episode_id] => Route::WatchEpisode {
                id: id.to_string(),
                episode_id: episode_id.to_string(),
            },
            ["auth", "login"] => Route::Login,
            ["auth", "register"] => Route::Register,
            ["admin", rest @ ..] => Route::Admin { rest: rest.join("/") },
            _ => Route::NotFound,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Profile | Route::Favorites | Route::History => Access::SignedIn,
            Route::Admin { .. } => Access::Admin,
            _ => Access::Public,
        }
    }
}

pub fn authorize(route: &Route, user: Option<&User>) -> AccessDecision {
    match (route.access(), user) {
        (Access::Public, _) => AccessDecision::Allowed,
        (_, None) => AccessDecision::SignInRequired {
            redirect: LOGIN_PATH.to_string(),
        },
        (Access::SignedIn, Some(_)) => AccessDecision::Allowed,
        (Access::Admin, Some(u)) if u.is_admin() => AccessDecision::Allowed,
        (Access::Admin, Some(_)) => AccessDecision::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(role: Option<&str>) -> User {
        serde_json::from_value(json!({ "id": "u1", "username": "neo", "role": role }))
            .expect("user decodes")
    }

    #[test]
    fn resolves_every_page() {
        assert_eq!(Route::resolve("/"), Route::Home);
        assert_eq!(Route::resolve("/movies/"), Route::Movies);
        assert_eq!(Route::resolve("/search?q=matrix"), Route::Search);
        assert_eq!(
            Route::resolve("/watch/v1/episode/e2"),
            Route::WatchEpisode {
                id: "v1".to_string(),
                episode_id: "e2".to_string()
            }
        );
        assert_eq!(Route::resolve("/auth/register"), Route::Register);
        assert_eq!(
            Route::resolve("/admin/videos/new"),
            Route::Admin {
                rest: "videos/new".to_string()
            }
        );
        assert_eq!(Route::resolve("/admin"), Route::Admin { rest: String::new() });
        assert_eq!(Route::resolve("/watch"), Route::NotFound);
        assert_eq!(Route::resolve("/nope/deeper"), Route::NotFound);
    }

    #[test]
    fn admin_subtree_requires_admin_role() {
        let route = Route::resolve("/admin/users");
        assert_eq!(authorize(&route, Some(&user(Some("admin")))), AccessDecision::Allowed);
        assert_eq!(authorize(&route, Some(&user(None))), AccessDecision::Denied);
        assert_eq!(
            authorize(&route, None),
            AccessDecision::SignInRequired {
                redirect: "/auth/login".to_string()
            }
        );
    }

    #[test]
    fn personal_pages_need_any_session() {
        assert_eq!(authorize(&Route::Favorites, Some(&user(None))), AccessDecision::Allowed);
        assert!(matches!(
            authorize(&Route::History, None),
            AccessDecision::SignInRequired { .. }
        ));
        assert_eq!(authorize(&Route::Home, None), AccessDecision::Allowed);
    }
}
