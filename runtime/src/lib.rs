// Copyright 2026 SiteDigest Contributors
// SPDX-License-Identifier: Apache-2.0

//! SiteDigest runtime: turns a website into a ranked, budgeted text corpus
//! with extracted pricing facts, ready for summarization.
//!
//! The flow is crawl ([`crawl`]) → normalize and rank ([`ranking`]) →
//! extract prices ([`pricing`]) → summarize ([`summarizer`]) → persist
//! ([`store`]), tied together by [`pipeline::DigestPipeline`].

pub mod cli;
pub mod config;
pub mod crawl;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod pricing;
pub mod ranking;
pub mod renderer;
pub mod rest;
pub mod store;
pub mod summarizer;
pub mod text;

pub use error::{DigestError, Result};
