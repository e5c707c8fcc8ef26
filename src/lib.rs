// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 The HieroScribe contributors

//! HieroScribe: AI-assisted Ancient Egyptian artifact toolkit
//!
//! Hieroglyph translation, artifact analysis, photorealistic re-rendering,
//! a chat assistant, quiz evaluation, blog generation, and speech synthesis,
//! all delegated to a hosted generation API, with a bounded local history
//! of performed analyses.

pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod media;
pub mod orchestrator;

pub use config::AppConfig;
pub use error::{HieroError, Result};
