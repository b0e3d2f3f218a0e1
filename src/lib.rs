pub mod config;
pub mod dataset;
pub mod error;
pub mod fairness;
pub mod jobs;
pub mod output;
pub mod scoring;
pub mod store;
