//! Database models and queries

pub mod departments;
pub mod init;
pub mod models;
pub mod seed;
pub mod users;
pub mod workers;

pub use init::*;
pub use models::*;
pub use seed::seed_sample_data;
