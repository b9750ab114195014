//! Infrastructure layer: job orchestration, collaborator clients, configuration.

pub mod config;
pub mod external;
pub mod jobs;
pub mod resolver;

mod integration_tests;
