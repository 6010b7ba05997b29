//! Deferred block rendering through signed Server Side Include fragments.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
