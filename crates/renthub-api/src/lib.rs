pub mod admin;
pub mod auth;
pub mod cache;
pub mod error;
pub mod likes;
pub mod listings;
pub mod middleware;
pub mod validate;
