//! Blocked sort-based inverted index
//!
//! The index of a collection is built in three stages: each block of the
//! collection is parsed by its own thread into a sorted block file, the block
//! files are merged under a fixed memory budget, and the merged posting lists
//! are weighted in a second pass. The resulting index answers boolean (CNF)
//! and ranked queries.

pub mod base;
pub mod builder;
pub mod codec;
pub mod collection;
pub mod error;
pub mod index;
pub mod registry;
pub mod search;
pub mod sets;
pub mod stats;
pub mod text;
pub mod utils;
pub mod weights;

pub use error::{Error, Result};
