//! Core types and trait definitions for the MDM request portal.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the request entity, the pure lifecycle rules that govern it, and the two
//! gateway traits (document store and generative advisor) that the engine is
//! written against.

// We intentionally use native `async fn` in trait impls (stabilised in Rust
// 1.75). Suppress the advisory lint about `Send` bounds on the returned
// futures.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod advisor;
pub mod error;
pub mod lifecycle;
pub mod request;
pub mod settings;
pub mod status;
pub mod store;
pub mod submission;

pub use error::{Error, Result};
