// Config module
// Run configuration resolved from the environment

pub mod run_config;

pub use run_config::RunConfig;
