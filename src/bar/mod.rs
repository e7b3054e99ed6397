//! The i3bar/swaybar side of things: blocks and the snapshot renderer.

pub mod block;
pub mod statusline;

pub use block::*;
pub use statusline::*;
