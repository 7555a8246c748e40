//! Placeholder Platform that uses `todo!(...)` for all implementations.

#![allow(dead_code)]

use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::identity::Identity;
use crate::platform::Platform;
use crate::users::PasswdEntry;

pub struct TodoPlatform;

impl Platform for TodoPlatform {
    fn effective_identity() -> Identity {
        todo!("effective_identity")
    }
    fn set_effective_identity(_identity: Identity) -> Result<(), io::Error> {
        todo!("set_effective_identity")
    }

    fn user_by_uid(_uid: u32) -> Result<Option<PasswdEntry>, io::Error> {
        todo!("user_by_uid")
    }

    fn owner(_metadata: &Metadata) -> Identity {
        todo!("owner")
    }
    fn allocated_bytes(metadata: &Metadata) -> u64 {
        metadata.len()
    }
    fn file_id(_metadata: &Metadata) -> (u64, u64, u64) {
        todo!("file_id")
    }

    fn symlink(_target: &Path, _link: &Path) -> Result<(), io::Error> {
        todo!("symlink")
    }
    fn set_mode(_path: &Path, _mode: u32) -> Result<(), io::Error> {
        todo!("set_mode")
    }

    fn is_cross_device(_err: &io::Error) -> bool {
        false
    }
}
