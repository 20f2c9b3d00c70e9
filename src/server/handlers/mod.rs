pub mod chat;
pub mod config;
pub mod documents;
pub mod engine;
pub mod health;
pub mod sessions;
