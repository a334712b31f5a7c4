//! Gemini client for the Reelscope asset lifecycle.
//!
//! This crate provides:
//! - Resumable uploads to the Gemini Files API
//! - File state lookup and deletion
//! - `generateContent` over an uploaded video
//! - Error classification into lifecycle service errors (quota vs. permanent)

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod types;

pub use client::{GeminiClient, Generation};
pub use config::{GeminiConfig, DEFAULT_MODEL};
pub use error::{GeminiError, GeminiResult};
pub use types::{FileState, GeminiFile};
