//! Data models for the staff service.
//!
//! The stored record, the create and patch inputs, and their conversions from
//! the generated wire types.

mod staff_member;

pub use staff_member::*;
