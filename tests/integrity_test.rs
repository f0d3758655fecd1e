//! Integrity-verifier scenarios: shallow pass/fail, deep content
//! tampering, aggregation across split parts, setup errors.

mod common;

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use coldpack::archive::{create_archive, ArchiveOptions};
use coldpack::error::ArchiveError;
use coldpack::hasher;
use coldpack::integrity::{check_integrity, CheckOutcome};
use coldpack::ops::Operators;
use coldpack::output::OutputCtx;

fn silent() -> OutputCtx {
    OutputCtx::silent()
}

fn archive_fixture(tmp: &Path) -> (std::path::PathBuf, std::path::PathBuf, Operators) {
    let root = common::build_test_folder(tmp);
    let dest = tmp.join("archive");
    let ops = common::test_operators();
    create_archive(&root, &dest, &ArchiveOptions::default(), &ops, &silent()).unwrap();
    (root, dest, ops)
}

/// Flip one byte in the middle of a file.
fn corrupt_file(path: &Path) {
    let mut f = fs::OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut byte = [0u8; 1];
    f.seek(SeekFrom::Start(10)).unwrap();
    f.read_exact(&mut byte).unwrap();
    byte[0] ^= 0xff;
    f.seek(SeekFrom::Start(10)).unwrap();
    f.write_all(&byte).unwrap();
}

/// Rebuild a part's tar/.tar.lz and their digest sidecars from the
/// current source state, leaving the original listing hash in place —
/// shallow then passes while the content no longer matches.
fn reseal_part(dest: &Path, source_root: &Path, part_name: &str, ops: &Operators) {
    let workdir = source_root.parent().unwrap();
    let entry = source_root.file_name().unwrap().to_str().unwrap();
    let tar_path = dest.join(format!("{}.tar", part_name));
    ops.tar.create(&tar_path, workdir, entry).unwrap();
    hasher::write_file_digest(&tar_path).unwrap();
    let lz = ops.compressor.compress(&tar_path, 6, None).unwrap();
    hasher::write_file_digest(&lz).unwrap();
}

#[test]
fn shallow_check_passes_on_a_fresh_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let (_root, dest, ops) = archive_fixture(tmp.path());

    let outcome = check_integrity(&dest, false, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::Ok));
}

#[test]
fn shallow_check_detects_artifact_corruption() {
    let tmp = tempfile::tempdir().unwrap();
    let (_root, dest, ops) = archive_fixture(tmp.path());

    corrupt_file(&dest.join("test-folder.tar.lz"));

    let outcome = check_integrity(&dest, false, None, &ops, &silent());
    match outcome {
        CheckOutcome::ShallowFailed { part } => {
            assert!(part.ends_with("test-folder.tar.lz"));
        }
        other => panic!("expected ShallowFailed, got {:?}", other),
    }
}

#[test]
fn shallow_failure_short_circuits_the_deep_check() {
    let tmp = tempfile::tempdir().unwrap();
    let (_root, dest, ops) = archive_fixture(tmp.path());

    corrupt_file(&dest.join("test-folder.tar.lz"));

    // Even with deep requested, a shallow mismatch is the verdict.
    let outcome = check_integrity(&dest, true, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::ShallowFailed { .. }));
}

#[test]
fn deep_check_passes_on_a_fresh_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let (_root, dest, ops) = archive_fixture(tmp.path());

    let outcome = check_integrity(&dest, true, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::Ok));
}

#[test]
fn deep_check_detects_content_tampering_behind_a_valid_signature() {
    let tmp = tempfile::tempdir().unwrap();
    let (root, dest, ops) = archive_fixture(tmp.path());

    // Change a source file, then re-seal the artifacts so the shallow
    // signatures are consistent again.
    fs::write(root.join("file1.txt"), b"tampered content\n").unwrap();
    reseal_part(&dest, &root, "test-folder", &ops);

    let outcome = check_integrity(&dest, false, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::Ok), "re-seal broke shallow");

    let outcome = check_integrity(&dest, true, None, &ops, &silent());
    match outcome {
        CheckOutcome::DeepFailed { paths } => {
            assert_eq!(paths, vec!["test-folder/file1.txt".to_string()]);
        }
        other => panic!("expected DeepFailed, got {:?}", other),
    }
}

#[test]
fn deep_check_visits_every_part_of_a_split_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("test-folder");
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a/first.bin"), vec![1u8; 300]).unwrap();
    fs::write(root.join("b/second.bin"), vec![2u8; 300]).unwrap();

    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let opts = ArchiveOptions {
        split_bytes: Some(500),
        ..Default::default()
    };
    let summary = create_archive(&root, &dest, &opts, &ops, &silent()).unwrap();
    assert_eq!(summary.parts, 2);

    let outcome = check_integrity(&dest, true, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::Ok));

    // Tamper with the LAST part: an early-returning verifier would
    // stop after part 1 and miss it.
    fs::write(root.join("b/second.bin"), vec![9u8; 300]).unwrap();
    let workdir = root.parent().unwrap();
    let tar_path = dest.join("test-folder.part2.tar");
    let list = tmp.path().join("part2-paths.txt");
    fs::write(&list, "test-folder/b\n").unwrap();
    ops.tar.create_from_list(&tar_path, workdir, &list).unwrap();
    hasher::write_file_digest(&tar_path).unwrap();
    let lz = ops.compressor.compress(&tar_path, 6, None).unwrap();
    hasher::write_file_digest(&lz).unwrap();

    let outcome = check_integrity(&dest, true, None, &ops, &silent());
    match outcome {
        CheckOutcome::DeepFailed { paths } => {
            assert_eq!(paths, vec!["test-folder/b/second.bin".to_string()]);
        }
        other => panic!("expected DeepFailed, got {:?}", other),
    }
}

#[test]
fn missing_listing_sidecar_is_a_setup_error() {
    let tmp = tempfile::tempdir().unwrap();
    let (_root, dest, ops) = archive_fixture(tmp.path());

    fs::remove_file(dest.join("test-folder.md5")).unwrap();

    let outcome = check_integrity(&dest, false, None, &ops, &silent());
    match outcome {
        CheckOutcome::SetupError { error } => {
            assert!(matches!(error, ArchiveError::MissingSidecar(p) if p.ends_with("test-folder.md5")));
        }
        other => panic!("expected SetupError, got {:?}", other),
    }
}

#[test]
fn empty_directory_is_a_setup_error() {
    let tmp = tempfile::tempdir().unwrap();
    let ops = common::test_operators();

    let outcome = check_integrity(tmp.path(), false, None, &ops, &silent());
    match outcome {
        CheckOutcome::SetupError { error } => {
            assert!(matches!(error, ArchiveError::NoArchivesFound { .. }));
        }
        other => panic!("expected SetupError, got {:?}", other),
    }
}

#[test]
fn single_part_file_can_be_checked_directly() {
    let tmp = tempfile::tempdir().unwrap();
    let (_root, dest, ops) = archive_fixture(tmp.path());

    let part = dest.join("test-folder.tar.lz");
    let outcome = check_integrity(&part, true, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::Ok));

    corrupt_file(&part);
    let outcome = check_integrity(&part, false, None, &ops, &silent());
    assert!(matches!(outcome, CheckOutcome::ShallowFailed { .. }));
}
