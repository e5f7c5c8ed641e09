// Library exports for Mentor Trader
// This allows integration tests and external code to use the server modules

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod diary;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod users;
