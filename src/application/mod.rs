//! Application layer: collaborator seams and error mapping.

pub mod blocks;
pub mod context;
pub mod error;
pub mod routing;
