//! Cross-module tests for the answer pipeline.

pub(crate) mod fakes;
