use std::ffi::CStr;
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::identity::Identity;
use crate::platform::Platform;
use crate::users::PasswdEntry;

/// Initial size of the scratch buffer handed to `getpwuid_r`.
const PASSWD_BUFFER_SIZE: usize = 4096;
/// We stop growing the scratch buffer past this size.
const PASSWD_BUFFER_MAX: usize = 1 << 20;

pub struct UnixPlatform;

fn check_result(val: libc::c_int) -> Result<libc::c_int, io::Error> {
    if val == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(val)
    }
}

fn getpwuid(uid: libc::uid_t) -> Result<Option<PasswdEntry>, io::Error> {
    let mut size = PASSWD_BUFFER_SIZE;
    loop {
        let mut buf: Vec<libc::c_char> = vec![0; size];
        // SAFETY: `passwd` is a plain C struct for which all zeroes is a valid value.
        let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        // SAFETY: every pointer is valid for the duration of the call and `buf.len()`
        // matches the allocation.
        let rc = unsafe {
            libc::getpwuid_r(uid, &mut entry, buf.as_mut_ptr(), buf.len(), &mut result)
        };

        if rc == libc::ERANGE && size < PASSWD_BUFFER_MAX {
            size *= 2;
            continue;
        }
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        if result.is_null() {
            return Ok(None);
        }

        // SAFETY: on success the string fields point into `buf`, which is still alive.
        let (name, home) = unsafe {
            (
                CStr::from_ptr(entry.pw_name).to_string_lossy().into_owned(),
                CStr::from_ptr(entry.pw_dir).to_string_lossy().into_owned(),
            )
        };
        return Ok(Some(PasswdEntry {
            name,
            home: PathBuf::from(home),
            identity: Identity {
                uid: entry.pw_uid,
                gid: entry.pw_gid,
            },
        }));
    }
}

impl Platform for UnixPlatform {
    fn effective_identity() -> Identity {
        // SAFETY: these calls cannot fail.
        let (uid, gid) = unsafe { (libc::geteuid(), libc::getegid()) };
        Identity { uid, gid }
    }

    fn set_effective_identity(identity: Identity) -> Result<(), io::Error> {
        let current = Self::effective_identity();
        if current == identity {
            return Ok(());
        }

        // The group can only change while we're still privileged, so the order depends
        // on which way we're going.
        //
        // SAFETY: plain syscalls without pointer arguments.
        unsafe {
            if identity.uid == 0 {
                check_result(libc::seteuid(identity.uid))?;
                check_result(libc::setegid(identity.gid))?;
            } else {
                check_result(libc::setegid(identity.gid))?;
                check_result(libc::seteuid(identity.uid))?;
            }
        }
        Ok(())
    }

    fn user_by_uid(uid: u32) -> Result<Option<PasswdEntry>, io::Error> {
        getpwuid(uid)
    }

    fn owner(metadata: &Metadata) -> Identity {
        Identity {
            uid: metadata.uid(),
            gid: metadata.gid(),
        }
    }

    fn allocated_bytes(metadata: &Metadata) -> u64 {
        // `st_blocks` is always in 512 byte units, regardless of the filesystem block size.
        metadata.blocks().saturating_mul(512)
    }

    fn file_id(metadata: &Metadata) -> (u64, u64, u64) {
        (metadata.dev(), metadata.ino(), metadata.nlink())
    }

    fn symlink(target: &Path, link: &Path) -> Result<(), io::Error> {
        std::os::unix::fs::symlink(target, link)
    }

    fn set_mode(path: &Path, mode: u32) -> Result<(), io::Error> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    fn is_cross_device(err: &io::Error) -> bool {
        err.raw_os_error() == Some(libc::EXDEV)
    }
}
