pub mod auth;
pub mod directory;
pub mod policy;
pub mod schema;
pub mod verification;
