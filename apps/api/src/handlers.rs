pub mod health;
pub mod records;
pub mod schema;
pub mod security;
pub mod tenancy;
