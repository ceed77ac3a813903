pub mod audit;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod logging;
pub mod model;
pub mod observability;
pub mod orchestrator;
pub mod registry;
pub mod toolcall;
pub mod triage;
pub mod types;
