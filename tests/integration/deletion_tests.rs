use dupdiff::actions::{
    apply, plan, ConfirmationState, DeleteConfig, DeleteError, StdinPrompt,
};
use dupdiff::duplicates::DuplicateFinder;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, name: &str, content: &[u8]) {
    fs::write(root.join(name), content).unwrap();
}

fn scan(root: &Path) -> Vec<dupdiff::duplicates::DuplicateGroup> {
    DuplicateFinder::with_defaults()
        .find_duplicates(root)
        .unwrap()
        .0
}

#[test]
fn test_no_then_all_keeps_first_candidate() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"copy");
    write(dir.path(), "b", b"copy");
    write(dir.path(), "c", b"copy");

    let plan = plan(&scan(dir.path()));
    assert_eq!(plan.len(), 2);

    let mut transcript = Vec::new();
    let mut prompt = StdinPrompt::new(Cursor::new(b"n\na\n".to_vec()), &mut transcript);
    let report = apply(
        &plan,
        ConfirmationState::AskEach,
        &mut prompt,
        &DeleteConfig::permanent(),
    );

    assert!(dir.path().join("a").exists());
    assert!(dir.path().join("b").exists());
    assert!(!dir.path().join("c").exists());
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.kept.len(), 1);
    assert_eq!(report.prompts, 2);
    assert_eq!(report.bytes_freed, 4);

    let transcript = String::from_utf8(transcript).unwrap();
    assert_eq!(transcript.matches("[y]es / [N]o / [a]ll").count(), 2);
}

#[test]
fn test_yes_to_all_spans_groups() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a1", b"first");
    write(dir.path(), "a2", b"first");
    write(dir.path(), "b1", b"second!");
    write(dir.path(), "b2", b"second!");
    write(dir.path(), "b3", b"second!");

    let plan = plan(&scan(dir.path()));
    let mut sink = Vec::new();
    let mut prompt = StdinPrompt::new(Cursor::new(b"all\n".to_vec()), &mut sink);
    let report = apply(
        &plan,
        ConfirmationState::AskEach,
        &mut prompt,
        &DeleteConfig::permanent(),
    );

    assert_eq!(report.prompts, 1);
    assert_eq!(report.deleted.len(), 3);
    assert!(dir.path().join("a1").exists());
    assert!(dir.path().join("b1").exists());
    assert!(!dir.path().join("a2").exists());
    assert!(!dir.path().join("b3").exists());
}

#[test]
fn test_batch_mode_never_prompts() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x", b"data");
    write(dir.path(), "y", b"data");

    let plan = plan(&scan(dir.path()));
    let mut sink = Vec::new();
    let mut prompt = StdinPrompt::new(Cursor::new(Vec::new()), &mut sink);
    let report = apply(
        &plan,
        ConfirmationState::AllYes,
        &mut prompt,
        &DeleteConfig::permanent(),
    );

    assert_eq!(report.prompts, 0);
    assert!(sink.is_empty());
    assert!(report.all_succeeded());
    assert!(!dir.path().join("y").exists());
}

#[test]
fn test_end_of_input_keeps_everything() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x", b"data");
    write(dir.path(), "y", b"data");
    write(dir.path(), "z", b"data");

    let plan = plan(&scan(dir.path()));
    let mut sink = Vec::new();
    let mut prompt = StdinPrompt::new(Cursor::new(b"maybe\n".to_vec()), &mut sink);
    let report = apply(
        &plan,
        ConfirmationState::AskEach,
        &mut prompt,
        &DeleteConfig::permanent(),
    );

    assert!(report.deleted.is_empty());
    assert_eq!(report.kept.len(), 2);
    assert!(String::from_utf8(sink)
        .unwrap()
        .contains("Please answer y, n or a."));
    for name in ["x", "y", "z"] {
        assert!(dir.path().join(name).exists());
    }
}

#[test]
fn test_failure_does_not_stop_remaining_deletions() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"copy");
    write(dir.path(), "b", b"copy");
    write(dir.path(), "c", b"copy");

    let plan = plan(&scan(dir.path()));
    fs::remove_file(dir.path().join("b")).unwrap();

    let mut sink = Vec::new();
    let mut prompt = StdinPrompt::new(Cursor::new(Vec::new()), &mut sink);
    let report = apply(
        &plan,
        ConfirmationState::AllYes,
        &mut prompt,
        &DeleteConfig::permanent(),
    );

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], DeleteError::NotFound(_)));
    assert_eq!(report.deleted.len(), 1);
    assert!(!dir.path().join("c").exists());
    assert!(dir.path().join("a").exists());
}

#[test]
fn test_missing_representative_protects_candidates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"copy");
    write(dir.path(), "b", b"copy");

    let plan = plan(&scan(dir.path()));
    fs::remove_file(dir.path().join("a")).unwrap();

    let mut sink = Vec::new();
    let mut prompt = StdinPrompt::new(Cursor::new(Vec::new()), &mut sink);
    let report = apply(
        &plan,
        ConfirmationState::AllYes,
        &mut prompt,
        &DeleteConfig::permanent(),
    );

    assert!(dir.path().join("b").exists());
    assert!(matches!(
        report.failures[0],
        DeleteError::RepresentativeMissing(_)
    ));
}
