//! # chest-rs
//!
//! `chest-rs` decodes legacy compound binary containers: OLE/CFB compound
//! files, Half-Life game cache files (GCF) and Microsoft cabinets. It reads,
//! lists and extracts the streams and files such containers hold.
//!
//! The crate works on already-parsed structural models: callers decode the
//! container's header and tables into a model (`CfbModel`, `GcfModel`,
//! `CabModel`) and hand it over together with a byte source; the crate then
//! resolves allocation chains, translates sector indices to byte offsets,
//! decompresses folder data and assembles whole entries.
//!
//! ## Usage
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! chest-rs = "0.1"
//! ```
//!
//! ### Example: Listing the streams of a compound file
//! ```rust
//! use chest_rs::byte_source::ByteSource;
//! use chest_rs::cfb_archive::{CfbArchive, CfbEntry, CfbModel};
//!
//! let source = ByteSource::from_buffer(vec![0u8; 512]);
//! let model = CfbModel {
//!     sector_shift: 9,
//!     mini_sector_shift: 6,
//!     mini_stream_cutoff: 4096,
//!     fat: vec![0xFFFF_FFFF],
//!     mini_fat: Vec::new(),
//!     entries: vec![CfbEntry {
//!         name: "Root Entry".to_string(),
//!         start_sector: 0,
//!         size: 0,
//!     }],
//!     mini_stream_start: 0,
//!     mini_stream_size: 0,
//! };
//! let archive = CfbArchive::new(source, model).unwrap();
//! for entry in archive.entries() {
//!     println!("Stream: {} ({} bytes)", entry.name, entry.size);
//! }
//! ```

pub mod allocation_table;
pub mod byte_source;
pub mod cab_archive;
pub mod cfb_archive;
pub mod checksum;
pub mod codec;
pub mod directory_tree;
pub mod error;
pub mod extract;
pub mod folder;
pub mod gcf_cache;
pub mod sector_map;
