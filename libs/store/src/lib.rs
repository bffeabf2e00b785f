//! # scour-store
//!
//! On-disk registry layout and cache-store access for the scour toolkit.
//!
//! The registry server owns this tree; scour only reads it and deletes
//! from it. Two concerns live here:
//!
//! - `layout`: every path in the registry's v2 storage tree, derived from
//!   a validated digest so path construction cannot be steered by input
//! - `cache`: the external lookup cache, reduced to the two operations
//!   repair needs (list keys containing a digest, delete a key)

pub mod cache;
pub mod layout;

pub use cache::{blob_presence_key, CacheError, CacheStore, MemoryCache, RedisCliCache};
pub use layout::RegistryLayout;
