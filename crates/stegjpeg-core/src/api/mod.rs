//! Path-based builder APIs for the two operations.

pub mod extract;
pub mod hide;
