//! Command line front ends of `tb`.
//!
//! * `tb-rm` moves its arguments into the invoking user's trash, see [`rm`].
//! * `tb-sweep` enforces the retention threshold on every user's trash, see [`sweep`].
//! * `tb-trash` lists and restores entries of the invoking user's trash, see [`trash`].

pub mod config;
pub mod logging;
pub mod rm;
pub mod sweep;
pub mod trash;
