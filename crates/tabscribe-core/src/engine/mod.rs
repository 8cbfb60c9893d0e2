pub mod backoff;
pub mod driver;
pub mod executor;
