//! Core data model: raw records, normalization context, normalized messages and cards.

pub mod address;
pub mod attachment;
pub mod card;
pub mod context;
pub mod message;
pub mod record;
