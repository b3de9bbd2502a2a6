//! API Routes
//!
//! Route handlers organized by functionality.

pub mod health;
pub mod labels;
pub mod meta;
pub mod videos;
