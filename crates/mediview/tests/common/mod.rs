//! Shared test utilities for mediview integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a pipeline to a temp-dir database and a fake engine
//! - Builders for PDF and PNG inputs and a scripted OCR engine

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{wait_for_terminal, TestHarness};
