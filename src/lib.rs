//! Catalog and image asset API: faceted product listings, reviews with a
//! derived rating summary, and chunked image storage in SQLite.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
