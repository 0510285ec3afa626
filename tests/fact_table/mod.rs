//! Shared fact table integration tests.
//!
//! Tests the FactTable interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod fact_table_tests;
