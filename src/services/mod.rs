pub mod assertion;
pub mod keys;
pub mod pipeline;
pub mod policy;
pub mod request;
pub mod token;
