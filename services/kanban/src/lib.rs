//! Board service library crate.
//!
//! # Purpose
//! Exposes the HTTP API, application wiring, configuration, entity schemas
//! and observability helpers for use by the binary and tests.
pub mod api;
pub mod app;
pub mod config;
pub mod model;
pub mod observability;
pub mod references;
