//! # blockvault — append-only block storage with cross-store deduplication
//!
//! Format guarantees:
//! - Every store is four sibling files: `.dat` (compressed block payloads),
//!   `.idx` (fixed-width big-endian index entries, one per block group),
//!   `.dsc` (block size, group size, direct dependency name), `.hsh` (one
//!   probe-hash byte per logical block)
//! - All multi-byte index fields are big-endian; never negotiated
//! - A store may declare one direct dependency; at open time the full
//!   ancestor chain is flattened by following each dependency's own `.dsc`
//! - A block is either stored locally (compressed) or recorded as a
//!   back-reference into a dependency at the same logical index; back-refs
//!   are never chased more than one level deep
//! - Compression codec and probe hasher are fixed at build/configuration
//!   time and never recorded on disk — a store must be reopened with the
//!   same codec it was written with
//! - There is no flush-on-drop: `close` is the only durability-guaranteeing
//!   path, and dropping an open store without it is an intentional abort

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod hasher;
pub mod index;
pub mod store;

pub use codec::{BlockCodec, CodecError, Lz4Codec, NoneCodec, ZstdCodec};
pub use descriptor::Descriptor;
pub use error::StoreError;
pub use hasher::{Blake3Probe, ProbeHasher};
pub use index::{IndexEntry, Slot};
pub use store::{Store, StoreOptions, WriteStats};
