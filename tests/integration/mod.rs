//! Integration tests for OpenVox Agent Planner
//!
//! These tests drive the API router end to end with mock fact sources,
//! and the PuppetDB client against a mock HTTP server.

mod api_tests;
mod puppetdb_tests;
