pub mod briefing;
pub mod config;
pub mod data;
pub mod error;
pub mod jobs;
pub mod market;
pub mod monitoring;
pub mod output;
pub mod prices;
