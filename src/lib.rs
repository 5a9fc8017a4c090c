pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod modules;
pub mod services;
pub mod utils;

pub use infrastructure::config;
pub use infrastructure::db;
pub use modules::integrations::hub;
pub use modules::integrations::ip_api;
