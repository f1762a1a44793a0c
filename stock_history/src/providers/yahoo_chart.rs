//! Yahoo Finance chart API (v8) provider.

pub mod params;
pub mod provider;
pub mod response;
