// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod csv_source;
pub mod http_response;
pub mod json_mapper;
pub mod sheets_source;
