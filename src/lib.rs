//! gerrit-ssh - Gerrit event streaming and administration over SSH.

pub mod admin;
pub mod client;
pub mod config;
pub mod display;
pub mod queue;
pub mod ssh;
pub mod stream;
pub mod watcher;

pub use client::GerritClient;
