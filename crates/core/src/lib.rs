//! Domain types and validation shared by the Lumen server and client.
//!
//! Nothing in this crate touches the network or the database; it holds the
//! rules both sides agree on (upload descriptors, gallery ordering, realtime
//! message shapes).

pub mod dimensions;
pub mod error;
pub mod image;
pub mod ordering;
pub mod realtime;
pub mod types;
pub mod upload;
