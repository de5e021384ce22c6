//! Session consistency for docdb
//!
//! Under session consistency a client must read its own writes. Every response
//! from a collection carries a session token (the highest LSN the serving
//! partition has committed); this crate remembers those tokens per collection
//! and partition range so they can be sent back on later reads.
//!
//! - [`token`]: the `range:lsn[,range:lsn...]` wire format
//! - [`container`]: the concurrent per-collection store

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod token;

pub use container::{PartitionTokens, SessionContainer};
pub use token::{format_composite, parse_composite, SessionToken};
