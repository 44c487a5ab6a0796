//! Low-level content helpers: RFC 2047 header decoding, address lists, and
//! HTML-to-text rendering.

pub mod header;
pub mod html;
