pub mod asset_link_service;
pub mod asset_service;
pub mod catalog_query;
pub mod catalog_service;
pub mod review_service;
