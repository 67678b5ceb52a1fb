//! Integration tests for the updraft manifest, diff and archive engine

mod config_integration;
mod end_to_end;
mod orchestrator_flow;
mod service_concurrency;
mod test_utils;
