//! Content moderation shared by both relay directions.
//!
//! - `normalize`: canonicalizes text to defeat obfuscated spellings
//! - `rules`: the fixed blocked-word and pattern lists
//! - `filter`: the three-pass classifier built on the two above

pub mod filter;
pub mod normalize;
pub mod rules;

pub use filter::ContentFilter;
