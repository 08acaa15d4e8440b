pub mod app;
pub mod clean;
pub mod config;
pub mod domain;
pub mod error;
pub mod gmt;
pub mod lookup;
pub mod ncbi;
pub mod output;
pub mod store;
pub mod wikipathways;
