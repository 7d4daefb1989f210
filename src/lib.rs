pub mod config;
pub mod crawler;
pub mod db;
pub mod error;
pub mod models;
pub mod search;
pub mod statistics;
pub mod store;
