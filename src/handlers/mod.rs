pub mod asset_handlers;
pub mod catalog_handlers;
pub mod guards;
pub mod health_handlers;
