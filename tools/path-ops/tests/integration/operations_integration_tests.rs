use path_ops::mock::RecordingLogger;
use path_ops::{FileSystemError, NoopLogger, PathOperations, RealFileSystem};
use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

fn create_test_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

fn operations() -> PathOperations<RealFileSystem, NoopLogger> {
    PathOperations::new(RealFileSystem::new(), NoopLogger)
}

#[test]
fn test_mkdir_dry_run_then_real() {
    let temp = TempDir::new().unwrap();
    let ops = operations();
    let path = temp.path().join("testDirMk");

    ops.mkdir(&[&path], 0o777, true).unwrap();
    assert!(!path.exists());

    ops.mkdir(&[&path], 0o777, false).unwrap();
    assert!(path.is_dir());
}

#[test]
fn test_mkdir_creates_parents_with_mode() {
    let temp = TempDir::new().unwrap();
    let ops = operations();
    let path = temp.path().join("a").join("b").join("c");

    ops.mkdir(&[&path], 0o700, false).unwrap();
    assert!(path.is_dir());
    assert_eq!(mode_of(&path), 0o700);

    // existing directories are fine
    ops.mkdir(&[&path], 0o700, false).unwrap();
}

#[test]
fn test_copy_tree_into_fresh_destination() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("testDir");
    let destination = temp.path().join("testDirMk");
    create_test_file(&source.join("testDir2").join("testFile"), b"nested");
    create_test_file(&source.join("top.txt"), b"top");
    fs::create_dir_all(source.join("empty")).unwrap();

    let ops = operations();
    ops.copy(&source, &destination, 0o777, true, true).unwrap();
    assert!(!destination.exists());

    ops.copy(&source, &destination, 0o777, false, false).unwrap();

    assert_eq!(fs::read(destination.join("testDir2/testFile")).unwrap(), b"nested");
    assert_eq!(fs::read(destination.join("top.txt")).unwrap(), b"top");
    assert!(destination.join("empty").is_dir());
}

#[test]
fn test_copy_keeps_file_permissions() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("script.sh");
    let destination = temp.path().join("copy.sh");
    create_test_file(&source, b"#!/bin/sh\n");
    fs::set_permissions(&source, fs::Permissions::from_mode(0o750)).unwrap();

    operations()
        .copy(&source, &destination, 0o777, false, false)
        .unwrap();

    assert_eq!(mode_of(&destination), 0o750);
}

#[test]
fn test_repeated_copy_into_existing_directory_is_noop() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src");
    let destination = temp.path().join("dst");
    create_test_file(&source.join("first.txt"), b"1");

    let logger = RecordingLogger::new();
    let ops = PathOperations::new(RealFileSystem::new(), logger.clone());
    ops.copy(&source, &destination, 0o777, false, false).unwrap();
    assert_eq!(logger.records().len(), 2);

    create_test_file(&source.join("second.txt"), b"2");
    fs::write(source.join("first.txt"), b"changed").unwrap();
    logger.clear();

    ops.copy(&source, &destination, 0o777, true, false).unwrap();

    assert!(!destination.join("second.txt").exists());
    assert_eq!(fs::read(destination.join("first.txt")).unwrap(), b"1");
    assert!(logger.records().is_empty());
}

#[test]
fn test_copy_file_override_flag() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("from.txt");
    let destination = temp.path().join("to.txt");
    create_test_file(&source, b"new");
    create_test_file(&destination, b"old");
    let ops = operations();

    let err = ops
        .copy(&source, &destination, 0o777, false, false)
        .unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::AlreadyExists));
    assert_eq!(fs::read(&destination).unwrap(), b"old");

    ops.copy(&source, &destination, 0o777, true, false).unwrap();
    assert_eq!(fs::read(&destination).unwrap(), b"new");
}

#[test]
fn test_copy_file_into_missing_directory() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.txt");
    let destination = temp.path().join("missing").join("a.txt");
    create_test_file(&source, b"alpha");
    let ops = operations();

    ops.copy(&source, &destination, 0o777, false, false).unwrap();
    assert_eq!(fs::read(&destination).unwrap(), b"alpha");

    let replaced = temp.path().join("other").join("a.txt");
    ops.copy(&source, &replaced, 0o777, true, false).unwrap();
    assert_eq!(fs::read(&replaced).unwrap(), b"alpha");
}

#[test]
fn test_dump_and_append() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("TestFileDump");
    let ops = operations();

    ops.dump_file(&path, "A", false).unwrap();
    ops.dump_file(&path, "B", false).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "B");

    ops.dump_file(&path, "A", false).unwrap();
    ops.append_to_file(&path, "B", false).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "AB");
}

#[test]
fn test_dump_replaces_whole_content_in_place() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.ini");
    create_test_file(&path, &vec![b'x'; 64 * 1024]);
    fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

    operations().dump_file(&path, "short", false).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    assert_eq!(mode_of(&path), 0o640);
    // no temporary files are left beside the target
    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("config.ini")]);
}

#[test]
fn test_append_creates_file_and_dry_run_is_pure() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("log.txt");
    let ops = operations();

    ops.append_to_file(&path, "ignored", true).unwrap();
    ops.dump_file(&path, "ignored", true).unwrap();
    assert!(!path.exists());

    ops.append_to_file(&path, "TEST", false).unwrap();
    ops.append_to_file(&path, "TEST", false).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "TESTTEST");
}

#[test]
fn test_rename_round_trip_tree() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("testDirMv");
    let destination = temp.path().join("testDirMove");
    create_test_file(&source.join("testDir2").join("testFile"), b"payload");
    let ops = operations();

    ops.rename(&source, &destination, false, false).unwrap();
    assert!(!source.exists());
    assert_eq!(fs::read(destination.join("testDir2/testFile")).unwrap(), b"payload");

    ops.move_path(&destination, &source, false, false).unwrap();
    assert!(!destination.exists());
    assert_eq!(fs::read(source.join("testDir2/testFile")).unwrap(), b"payload");
}

#[test]
fn test_rename_existing_target() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.txt");
    let b = temp.path().join("b.txt");
    create_test_file(&a, b"a");
    create_test_file(&b, b"b");
    let ops = operations();

    let err = ops.rename(&a, &b, false, false).unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::AlreadyExists));
    assert!(a.exists());

    ops.rename(&a, &b, true, false).unwrap();
    assert!(!a.exists());
    assert_eq!(fs::read(&b).unwrap(), b"a");
}

#[test]
fn test_rename_over_directory_with_override() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("new");
    let destination = temp.path().join("old");
    create_test_file(&source.join("kept.txt"), b"kept");
    create_test_file(&destination.join("stale.txt"), b"stale");

    operations()
        .rename(&source, &destination, true, false)
        .unwrap();

    assert!(destination.join("kept.txt").exists());
    assert!(!destination.join("stale.txt").exists());
}

#[test]
fn test_rename_onto_itself_keeps_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    create_test_file(&dir.join("precious.txt"), b"keep");
    let ops = operations();

    ops.rename(&dir, &dir, true, false).unwrap();
    assert_eq!(fs::read(dir.join("precious.txt")).unwrap(), b"keep");

    // a different spelling of the same directory
    let aliased = dir.join("..").join("data");
    ops.rename(&dir, &aliased, true, false).unwrap();
    assert_eq!(fs::read(dir.join("precious.txt")).unwrap(), b"keep");

    let err = ops.rename(&dir, &dir, false, false).unwrap_err();
    assert_eq!(err.kind(), Some(io::ErrorKind::AlreadyExists));
}

#[test]
fn test_rename_file_onto_hard_link_keeps_content() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("file");
    let link = temp.path().join("link");
    create_test_file(&file, b"shared");
    fs::hard_link(&file, &link).unwrap();

    operations().rename(&file, &link, true, false).unwrap();

    assert_eq!(fs::read(&link).unwrap(), b"shared");
}

#[test]
fn test_remove_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let tree = temp.path().join("tree");
    create_test_file(&tree.join("inner").join("file"), b"x");
    let ops = operations();

    ops.remove(&[&tree], true).unwrap();
    assert!(tree.exists());

    ops.remove(&[&tree], false).unwrap();
    assert!(!tree.exists());

    ops.remove(&[&tree], false).unwrap();
}

#[test]
fn test_remove_symlink_keeps_target() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("target");
    let link = temp.path().join("link");
    create_test_file(&target.join("file"), b"x");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    operations().remove(&[&link], false).unwrap();

    assert!(fs::symlink_metadata(&link).is_err());
    assert!(target.join("file").exists());
}

#[test]
fn test_exists() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("present");
    create_test_file(&file, b"x");
    let ops = operations();

    assert!(ops.exists(&[&file, &temp.path().to_path_buf()]).unwrap());
    assert!(!ops.exists(&[file.clone(), temp.path().join("absent")]).unwrap());
}

#[test]
fn test_touch_sets_times() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stamp");
    let modified = UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    let accessed = UNIX_EPOCH + Duration::from_secs(1_100_000_000);
    let ops = operations();

    ops.touch(&path, Some(modified), Some(accessed), true).unwrap();
    assert!(!path.exists());

    ops.touch(&path, Some(modified), Some(accessed), false).unwrap();
    let metadata = fs::metadata(&path).unwrap();
    assert_eq!(metadata.len(), 0);
    assert_eq!(metadata.modified().unwrap(), modified);
    assert_eq!(metadata.accessed().unwrap(), accessed);
}

#[test]
fn test_touch_keeps_content() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("existing");
    create_test_file(&path, b"keep me");

    operations().touch(&path, None, None, false).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"keep me");
}

#[test]
fn test_chmod_with_umask_and_recursion() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("perm");
    let file = dir.join("file");
    create_test_file(&file, b"x");
    fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();
    let ops = operations();

    ops.chmod(&[&dir], 0o777, 0o027, false, false).unwrap();
    assert_eq!(mode_of(&dir), 0o750);
    assert_eq!(mode_of(&file), 0o600);

    ops.chmod(&[&dir], 0o755, 0, true, true).unwrap();
    assert_eq!(mode_of(&file), 0o600);

    ops.chmod(&[&dir], 0o755, 0, true, false).unwrap();
    assert_eq!(mode_of(&dir), 0o755);
    assert_eq!(mode_of(&file), 0o755);
}

#[test]
fn test_chown_to_current_ids() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("owned");
    let file = dir.join("file");
    create_test_file(&file, b"x");
    let metadata = fs::metadata(&file).unwrap();
    let uid = metadata.uid().to_string();
    let gid = metadata.gid().to_string();

    operations()
        .chown(&[&dir], &uid, Some(gid.as_str()), true, false)
        .unwrap();

    assert_eq!(fs::metadata(&file).unwrap().uid().to_string(), uid);
    assert_eq!(fs::metadata(&dir).unwrap().gid().to_string(), gid);
}

#[test]
fn test_chown_unknown_user() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("file");
    create_test_file(&file, b"x");
    let ops = operations();

    let err = ops
        .chown(&[&file], "no-such-user-for-path-ops", None, false, false)
        .unwrap_err();
    assert!(matches!(err, FileSystemError::UnknownUser(ref name) if name == "no-such-user-for-path-ops"));

    // dry-run never resolves the owner
    ops.chown(&[&file], "no-such-user-for-path-ops", None, false, true)
        .unwrap();
}
