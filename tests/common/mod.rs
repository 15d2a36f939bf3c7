//! Common test utilities and fixtures for the pkbridge-core test suite.
//!
//! Shared test data, instrumented collaborators (allocator, randomness,
//! engine) and helpers used across integration, property and stress tests.

#![allow(dead_code)]

pub mod fixtures;
