//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one part of the bridge
//! against the mock NFC platform.  No NFC hardware is required.

mod lifecycle_tests;
mod session_tests;
