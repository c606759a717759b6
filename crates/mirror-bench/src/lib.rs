pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod results;
pub mod runner;
pub mod scheduler;
pub mod sites;
pub mod stats;
pub mod system;
