//! `threadline`: message normalization and thread segmentation for
//! multi-channel support inboxes.
//!
//! This crate turns raw stored message rows into display-ready cards. It
//! separates fresh content from quoted history, resolves who wrote what,
//! removes duplicates across overlapping pages, optionally expands quoted
//! history into synthetic cards, and estimates how much of a conversation
//! is still unloaded.

pub mod config;
pub mod dedup;
pub mod error;
pub mod estimate;
pub mod feed;
pub mod i18n;
pub mod identity;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod quote;
pub mod segment;
pub mod source;
