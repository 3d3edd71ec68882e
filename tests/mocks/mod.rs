//! Mock implementations of the external tools
//!
//! Integration tests drive the real pipeline against a scripted
//! `ProcessRunner`, so no downloader or sync binary has to be installed.

pub mod mock_runner;

pub use mock_runner::{Invocation, ScriptedRunner};
