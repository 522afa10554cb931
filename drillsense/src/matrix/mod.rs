//! Job Matrix Module
//!
//! Row model of the CAM job matrix and the copper stack derived from it.

pub mod schema;
pub mod stack;

pub use schema::*;
pub use stack::CopperStack;
