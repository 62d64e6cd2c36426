//! Unit tests for lutra
//!
//! These tests exercise configuration, providers, history and retention
//! without touching a container runtime.

mod config;
mod history;
mod retention;
mod secrets;
