//! LogiNews - a daily logistics news briefing
//!
//! Collects articles from RSS/Atom feeds and HTML list pages, drops duplicate
//! URLs, summarizes and classifies each article, ranks by views and recency,
//! and groups the result into fixed newsletter sections.

pub mod cli;
pub mod collector;
pub mod config;
pub mod date;
pub mod db;
pub mod dedupe;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod rank;
pub mod render;
pub mod routes;
pub mod sections;
