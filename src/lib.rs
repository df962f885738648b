//! Hero and villain statistics over plays fetched from a search index.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod source;
