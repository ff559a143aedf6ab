pub mod health;
pub mod sessions;
pub mod tenants;
pub mod whoami;
