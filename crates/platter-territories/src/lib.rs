//! # Platter Territories
//!
//! Directory structures of the file systems found inside partitions:
//! - **ext2/ext4**: linear directory blocks, with the ext4 checksum tail
//! - **XFS**: short-form (inline) directories and block-form directories
//!
//! Parsers work on byte slices the caller has already read from a
//! partition, and report every entry as a [`platter_core::DirectoryEntry`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_territories::xfs::DirectoryBlock;
//!
//! let block = std::fs::read("dirblock.bin").unwrap();
//! let dir = DirectoryBlock::parse(&block, true).unwrap();
//! for entry in dir.directory_entries().unwrap() {
//!     println!("{:>10} {}", entry.inode, entry.name);
//! }
//! ```

pub mod ext2;
pub mod xfs;

pub use ext2::{Ext2DirectoryBlock, Ext2DirectoryRecord, Ext2FileType};
pub use xfs::{DirectoryBlock, ShortformDirectory};
