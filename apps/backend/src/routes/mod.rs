//! HTTP route handlers

pub mod progress;
