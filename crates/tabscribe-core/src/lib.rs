pub mod check;
pub mod config;
pub mod engine;
pub mod errors;
pub mod linearize;
pub mod materialize;
pub mod model;
pub mod providers;
pub mod report;
pub mod storage;
pub mod table;
pub mod template;
