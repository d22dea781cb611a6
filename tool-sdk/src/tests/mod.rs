//! Unit tests for the Tool SDK
//!
//! This module contains tests for various components of the SDK.

pub mod openai_mock_tests;
