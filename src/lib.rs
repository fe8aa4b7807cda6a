pub mod admin;
pub mod app;
pub mod comments;
pub mod config;
pub mod episodes;
pub mod favorites;
pub mod genres;
pub mod handlers;
pub mod history;
pub mod home;
pub mod models;
pub mod notify;
pub mod pocketbase;
pub mod preferences;
pub mod ratings;
pub mod routes;
pub mod search;
pub mod session;
pub mod upsert;
pub mod watch;
