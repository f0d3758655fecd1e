//! Encryption adapter scenarios: all-or-nothing directory handling,
//! septet layout, removal ordering, verification of encrypted sets.

mod common;

use std::fs;

use coldpack::archive::{create_archive, ArchiveOptions};
use coldpack::encryption::{decrypt_existing_archive, encrypt_existing_archive};
use coldpack::error::ArchiveError;
use coldpack::integrity::{check_integrity, CheckOutcome};
use coldpack::output::OutputCtx;

fn keys() -> Vec<String> {
    vec!["alice@example.org".into(), "bob@example.org".into()]
}

#[test]
fn encrypting_an_archive_directory_adds_the_gpg_pair_per_part() {
    let tmp = tempfile::tempdir().unwrap();
    let root = common::build_test_folder(tmp.path());
    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    create_archive(&root, &dest, &ArchiveOptions::default(), &ops, &out).unwrap();
    encrypt_existing_archive(&dest, &keys(), None, false, false, &ops, &out).unwrap();

    assert_eq!(
        common::dir_file_names(&dest),
        vec![
            "test-folder.md5",
            "test-folder.tar.lst",
            "test-folder.tar.lz",
            "test-folder.tar.lz.gpg",
            "test-folder.tar.lz.gpg.md5",
            "test-folder.tar.lz.md5",
            "test-folder.tar.md5",
        ]
    );

    // The encrypted artifact is a transformation, not a copy.
    let plain = fs::read(dest.join("test-folder.tar.lz")).unwrap();
    let cipher = fs::read(dest.join("test-folder.tar.lz.gpg")).unwrap();
    assert_ne!(plain, cipher);
}

#[test]
fn encrypting_twice_is_refused_and_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let root = common::build_test_folder(tmp.path());
    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    create_archive(&root, &dest, &ArchiveOptions::default(), &ops, &out).unwrap();
    encrypt_existing_archive(&dest, &keys(), None, false, false, &ops, &out).unwrap();

    let before = common::dir_file_names(&dest);
    let err = encrypt_existing_archive(&dest, &keys(), None, false, false, &ops, &out).unwrap_err();
    assert!(matches!(err, ArchiveError::AlreadyEncrypted));
    assert_eq!(common::dir_file_names(&dest), before);
}

#[test]
fn encrypting_an_empty_directory_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("empty");
    fs::create_dir(&dir).unwrap();
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    let err = encrypt_existing_archive(&dir, &keys(), None, false, false, &ops, &out).unwrap_err();
    assert!(matches!(err, ArchiveError::NoArchivesFound { .. }));
}

#[test]
fn remove_unencrypted_deletes_the_plain_pair() {
    let tmp = tempfile::tempdir().unwrap();
    let root = common::build_test_folder(tmp.path());
    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    let opts = ArchiveOptions {
        encryption_keys: keys(),
        remove_unencrypted: true,
        ..Default::default()
    };
    let summary = create_archive(&root, &dest, &opts, &ops, &out).unwrap();
    assert!(summary.encrypted);

    assert_eq!(
        common::dir_file_names(&dest),
        vec![
            "test-folder.md5",
            "test-folder.tar.lst",
            "test-folder.tar.lz.gpg",
            "test-folder.tar.lz.gpg.md5",
            "test-folder.tar.md5",
        ]
    );
}

#[test]
fn encrypting_a_single_part_file_works() {
    let tmp = tempfile::tempdir().unwrap();
    let root = common::build_test_folder(tmp.path());
    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    create_archive(&root, &dest, &ArchiveOptions::default(), &ops, &out).unwrap();
    let part = dest.join("test-folder.tar.lz");
    encrypt_existing_archive(&part, &keys(), None, false, false, &ops, &out).unwrap();

    assert!(dest.join("test-folder.tar.lz.gpg").exists());
    assert!(dest.join("test-folder.tar.lz.gpg.md5").exists());
}

#[test]
fn wrong_file_type_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let stray = tmp.path().join("notes.txt");
    fs::write(&stray, b"hello").unwrap();
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    let err = encrypt_existing_archive(&stray, &keys(), None, false, false, &ops, &out).unwrap_err();
    assert!(matches!(err, ArchiveError::WrongFileType { .. }));
}

#[test]
fn decrypting_is_refused_while_plain_parts_are_present() {
    let tmp = tempfile::tempdir().unwrap();
    let root = common::build_test_folder(tmp.path());
    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    create_archive(&root, &dest, &ArchiveOptions::default(), &ops, &out).unwrap();
    encrypt_existing_archive(&dest, &keys(), None, false, false, &ops, &out).unwrap();

    let err = decrypt_existing_archive(&dest, None, false, false, &ops, &out).unwrap_err();
    assert!(matches!(err, ArchiveError::AlreadyDecrypted));
}

#[test]
fn decryption_restores_the_compressed_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let root = common::build_test_folder(tmp.path());
    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    let opts = ArchiveOptions {
        encryption_keys: keys(),
        remove_unencrypted: true,
        ..Default::default()
    };
    create_archive(&root, &dest, &opts, &ops, &out).unwrap();

    decrypt_existing_archive(&dest, None, false, false, &ops, &out).unwrap();
    assert!(dest.join("test-folder.tar.lz").exists());

    // The restored artifact decompresses to a valid tar again.
    let listing = ops
        .tar
        .list(&dest.join("test-folder.tar.lz"), None)
        .unwrap();
    assert!(listing.contains("test-folder/file1.txt"));
}

#[test]
fn split_encrypted_archive_verifies_from_gpg_artifacts_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("test-folder");
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a/first.bin"), vec![1u8; 300]).unwrap();
    fs::write(root.join("b/second.bin"), vec![2u8; 300]).unwrap();

    let dest = tmp.path().join("archive");
    let ops = common::test_operators();
    let out = OutputCtx::silent();

    let opts = ArchiveOptions {
        split_bytes: Some(500),
        encryption_keys: keys(),
        remove_unencrypted: true,
        ..Default::default()
    };
    let summary = create_archive(&root, &dest, &opts, &ops, &out).unwrap();
    assert_eq!(summary.parts, 2);

    // Shallow verification runs against the .gpg artifacts.
    let outcome = check_integrity(&dest, false, None, &ops, &out);
    assert!(matches!(outcome, CheckOutcome::Ok));

    // Deep verification additionally decrypts and extracts each part.
    let outcome = check_integrity(&dest, true, None, &ops, &out);
    assert!(matches!(outcome, CheckOutcome::Ok));
}
