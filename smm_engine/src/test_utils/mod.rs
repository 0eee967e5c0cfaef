//! Helpers for tests that need a real database, seeded reference data, or scripted remote services.
pub mod fakes;
pub mod fixtures;
pub mod prepare_env;
