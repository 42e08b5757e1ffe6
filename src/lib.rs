pub mod api;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod hosts;
pub mod queue;
pub mod scrape;
pub mod session;
pub mod wait;
