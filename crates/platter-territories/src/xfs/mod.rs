//! XFS directory formats
//!
//! Two layouts are decoded: short-form directories stored inline in the
//! inode, and single-block directories whose entries are found through a
//! hash-sorted leaf at the end of the block.

pub mod block;
pub mod shortform;

pub use block::{
    da_hashname, parse_directory_blocks, BestFree, BlockMagic, BlockTail, DataBlockHeader, DataEntry,
    Dir3Info, DirectoryBlock, LeafEntry,
};
pub use shortform::{InodeWidth, ShortformDirectory, ShortformEntry, ShortformHeader};
