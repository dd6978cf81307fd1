//! gh-mcp wrapper library.
//!
//! This crate materializes the bundled `github-mcp-server` executable from an
//! embedded, checksummed archive, stages it in a tamper-checked directory,
//! and supervises it as a child process wired to the caller's standard
//! streams. It is used by the `gh-mcp` CLI binary and can be consumed
//! programmatically for testing.
//!
//! # Modules
//!
//! - [`auth`] - Credential resolution against the `gh` CLI conventions
//! - [`bundle`] - Platform selection of the embedded server archive
//! - [`checksum`] - SHA-256 verification of the embedded archive
//! - [`child_env`] - Allow-listed child environment construction
//! - [`cli`] - Command-line argument definitions
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types
//! - [`extract`] - Bounded extraction of the server executable
//! - [`server`] - Materialize-and-run orchestration
//! - [`shutdown`] - Cooperative shutdown signalling
//! - [`staging`] - Hardened staging-directory creation and cleanup
//! - [`supervisor`] - Child process lifecycle supervision

pub mod auth;
pub mod bundle;
pub mod checksum;
pub mod child_env;
pub mod cli;
pub mod dirs;
pub mod error;
pub mod extract;
pub mod server;
pub mod shutdown;
pub mod staging;
pub mod supervisor;
