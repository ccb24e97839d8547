//! Cross-module integration tests.
