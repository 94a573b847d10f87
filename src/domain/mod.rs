//! Domain layer for Frontend Guardian
//!
//! Findings, the report aggregate and the error vocabulary shared by every
//! rule. Nothing in here touches the file system.

pub mod findings;

// Re-export main domain types for convenience
pub use findings::*;
