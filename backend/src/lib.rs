pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod state;
pub mod storage;
pub mod supabase;
pub mod test_utils;
