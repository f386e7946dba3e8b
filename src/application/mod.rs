// Application layer - Use cases and collaborator contracts
pub mod dashboard_service;
pub mod row_source;
