//! Markup produced for the edge.

pub mod blocks;
