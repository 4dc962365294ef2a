//! Travel blog - a REST backend for travel stories
//!
//! Users register and log in with JWT access/refresh tokens, publish posts
//! and leave threaded comments on them.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
