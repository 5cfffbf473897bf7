//! Shared test utilities for erp-reports integration tests.
//!
//! This module provides:
//! - `FakePortal` / `FakeLauncher`, a scripted stand-in for the browser
//! - `TestHarness` for isolated runs with temp destination and download folders

pub mod fake_portal;
pub mod harness;

#[allow(unused_imports)]
pub use fake_portal::{FakeLauncher, PortalScript};
#[allow(unused_imports)]
pub use harness::TestHarness;
