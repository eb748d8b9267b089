// src/lib.rs

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod ids;
pub mod objects;
pub mod record;
pub mod schema;
pub mod service;
