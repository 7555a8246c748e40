//! Small utilities shared by every `tb` crate.
//!
//! Like any good ore, this crate should stay free of heavy dependencies.

pub mod assert;
pub mod clock;
pub mod env;
pub mod human;
