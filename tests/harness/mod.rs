//! Shared helpers for the integration tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

mod client;
mod logs;
mod server;

pub use client::{HttpResponse, TestClient, raw_request};
pub use logs::{CapturedLogs, capture_logs};
pub use server::TestServer;
