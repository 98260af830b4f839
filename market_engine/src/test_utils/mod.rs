//! Helpers for tests of the engine and the crates that build on it.
pub mod fake_gateway;
pub mod prepare_env;
