use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tb_ore::{assert_exists, assert_missing};

use crate::identity::Identity;
use crate::staging::{StagedCopy, STAGING_PREFIX};
use crate::transfer::{move_path, remove_tree, MoveKind};
use crate::usage::disk_usage;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn smoketest_move_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let src = temp.path().join("notes.txt");
    let dst = temp.path().join("trash").join("notes.txt");
    write(&src, "hello world");
    fs::set_permissions(&src, fs::Permissions::from_mode(0o640)).unwrap();
    fs::create_dir_all(dst.parent().unwrap()).unwrap();

    let kind = move_path(&src, &dst).unwrap();
    assert_eq!(kind, MoveKind::Renamed);
    assert_missing!(src);
    assert_eq!(fs::read_to_string(&dst).unwrap(), "hello world");
    let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o640);
}

#[test]
fn move_refuses_to_overwrite() {
    let temp = tempfile::TempDir::new().unwrap();
    let src = temp.path().join("a");
    let dst = temp.path().join("b");
    write(&src, "a");
    write(&dst, "b");

    let err = move_path(&src, &dst).unwrap_err();
    assert!(matches!(err, crate::Error::Exists { .. }));
    assert_eq!(fs::read_to_string(&src).unwrap(), "a");
    assert_eq!(fs::read_to_string(&dst).unwrap(), "b");
}

#[test]
fn move_missing_source_is_not_found() {
    let temp = tempfile::TempDir::new().unwrap();
    let err = move_path(&temp.path().join("nope"), &temp.path().join("dst")).unwrap_err();
    assert!(
        matches!(&err, crate::Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound),
        "{err}"
    );
    assert!(err.to_string().contains("No such file or directory"), "{err}");
}

#[test]
fn smoketest_staged_copy() {
    let temp = tempfile::TempDir::new().unwrap();
    let src = temp.path().join("project");
    write(&src.join("src/main.rs"), "fn main() {}");
    write(&src.join("README"), "read me");
    fs::set_permissions(src.join("README"), fs::Permissions::from_mode(0o600)).unwrap();
    std::os::unix::fs::symlink("README", src.join("link")).unwrap();
    fs::set_permissions(src.join("src"), fs::Permissions::from_mode(0o750)).unwrap();

    let dst = temp.path().join("copy");
    let staged = StagedCopy::create(&src, &dst).unwrap();
    let staged_name = staged.path().file_name().unwrap().to_str().unwrap().to_string();
    assert!(staged_name.starts_with(STAGING_PREFIX), "{staged_name}");
    assert_missing!(dst);
    staged.persist(&dst).unwrap();

    assert_missing!(temp.path().join(&staged_name));
    assert_eq!(fs::read_to_string(dst.join("src/main.rs")).unwrap(), "fn main() {}");
    assert_eq!(fs::read_link(dst.join("link")).unwrap(), Path::new("README"));
    let mode = |p: &Path| fs::symlink_metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&dst.join("README")), 0o600);
    assert_eq!(mode(&dst.join("src")), 0o750);
    assert_eq!(
        fs::metadata(src.join("src/main.rs")).unwrap().modified().unwrap(),
        fs::metadata(dst.join("src/main.rs")).unwrap().modified().unwrap(),
    );
    // The original is untouched, removing it is up to the caller.
    assert_exists!(src.join("src/main.rs"));
}

#[test]
fn dropped_staged_copy_is_cleaned_up() {
    let temp = tempfile::TempDir::new().unwrap();
    let src = temp.path().join("dir");
    write(&src.join("file"), "data");

    let staged = StagedCopy::create(&src, &temp.path().join("dst")).unwrap();
    let staged_path = staged.path().to_path_buf();
    assert_exists!(staged_path);
    drop(staged);
    assert_missing!(staged_path);
}

#[test]
fn staged_copy_of_a_symlinked_directory_is_a_symlink() {
    let temp = tempfile::TempDir::new().unwrap();
    let target = temp.path().join("target");
    write(&target.join("file"), "data");
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let dst = temp.path().join("copy");
    StagedCopy::create(&link, &dst).unwrap().persist(&dst).unwrap();
    assert_eq!(fs::read_link(&dst).unwrap(), target);
    assert_eq!(fs::read_dir(&target).unwrap().count(), 1);
}

#[test]
fn remove_tree_is_idempotent() {
    let temp = tempfile::TempDir::new().unwrap();
    let dir = temp.path().join("entry");
    write(&dir.join("a/b/c"), "data");

    assert!(remove_tree(&dir).unwrap());
    assert_missing!(dir);
    assert!(!remove_tree(&dir).unwrap());
}

#[test]
fn smoketest_disk_usage() {
    let temp = tempfile::TempDir::new().unwrap();
    let dir = temp.path().join("usage");
    write(&dir.join("big"), &"x".repeat(64 * 1024));
    fs::hard_link(dir.join("big"), dir.join("big-link")).unwrap();

    let usage = disk_usage(&dir).unwrap();
    // root directory, one file, its hard link is skipped.
    assert_eq!(usage.entries, 2);
    assert!(usage.bytes >= 64 * 1024, "{usage:?}");
    assert_eq!(usage.unreadable, 0);

    let missing = disk_usage(&temp.path().join("missing")).unwrap();
    assert_eq!(missing, Default::default());
}

#[test]
fn disk_usage_does_not_follow_a_symlinked_root() {
    let temp = tempfile::TempDir::new().unwrap();
    let target = temp.path().join("target");
    write(&target.join("big"), &"x".repeat(4 * 1024 * 1024));
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let usage = disk_usage(&link).unwrap();
    assert_eq!(usage.entries, 1);
    assert!(usage.bytes < 64 * 1024, "{usage:?}");
    assert!(disk_usage(&target).unwrap().bytes >= 4 * 1024 * 1024);
}

#[test]
fn acting_as_ourselves_is_free() {
    let temp = tempfile::TempDir::new().unwrap();
    let owner = Identity::owner_of(temp.path()).unwrap();
    assert_eq!(owner.uid, Identity::current().uid);

    let guard = owner.assume(temp.path()).unwrap();
    assert!(!guard.switched());
}

#[test]
fn unprivileged_cannot_act_as_others() {
    let current = Identity::current();
    if current.uid == 0 {
        // Root can become anyone, nothing to check.
        return;
    }
    let other = Identity {
        uid: current.uid + 1,
        gid: current.gid,
    };
    let err = other.assume(Path::new("/somewhere")).unwrap_err();
    assert!(matches!(err, crate::Error::RequiresIdentity { .. }), "{err}");
}
