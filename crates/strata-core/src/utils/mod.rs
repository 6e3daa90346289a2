//! Wire-format helpers shared by the trackers and middleware.

pub mod block_param;

pub use block_param::{quantity, to_quantity, BlockRef, BlockTag};
