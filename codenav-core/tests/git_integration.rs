use codenav_core::git::head_commit_sha;
use codenav_core::{
    GitCommandClient, NoopPermissionChecker, Position, Repo, RepositoryCommit, RequestArgs,
    RequestConfig, RequestState, StoredUpload,
};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

/// Run a git command and assert it succeeded
fn git(root: &std::path::Path, args: &[&str]) -> std::process::Output {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn commit_file(root: &std::path::Path, contents: &str, message: &str) -> String {
    std::fs::write(root.join("src/lib.rs"), contents).unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-m", message]);
    head_commit_sha(root).unwrap()
}

/// Two commits of src/lib.rs: the second inserts two lines after line 2
/// and rewrites line 5.
fn create_test_repo() -> (TempDir, String, String) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    git(root, &["init"]);
    git(root, &["config", "user.email", "test@test.com"]);
    git(root, &["config", "user.name", "Test"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    std::fs::create_dir_all(root.join("src")).unwrap();

    let first = commit_file(root, "one\ntwo\nthree\nfour\nfive\nsix\n", "first");
    let second = commit_file(
        root,
        "one\ntwo\nnew-a\nnew-b\nthree\nfour\nFIVE\nsix\n",
        "second",
    );
    (dir, first, second)
}

fn upload(id: i32, commit: &str) -> StoredUpload {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "commit": commit,
        "root": "",
        "visible_at_tip": true,
        "uploaded_at": "2024-06-01T10:00:00Z",
        "state": "completed",
        "repository_id": 1,
        "repository_name": "test-repo",
        "indexer": "scip-rust",
        "indexer_version": "0.4.0"
    }))
    .unwrap()
}

fn request_state(dir: &TempDir, commit: &str, uploads: Vec<StoredUpload>) -> RequestState {
    let repo = Repo {
        id: 1,
        name: "test-repo".to_string(),
    };
    let client = Arc::new(GitCommandClient::new());
    client.register(&repo, dir.path());

    RequestState::new(
        uploads,
        Arc::new(NoopPermissionChecker),
        client.clone(),
        RequestArgs {
            repo,
            commit: commit.to_string(),
            path: "src/lib.rs".to_string(),
        },
        client,
        &RequestConfig {
            maximum_indexes_per_moniker_search: 50,
            hunk_cache_size: 100,
        },
    )
    .unwrap()
}

#[test]
fn test_translate_positions_between_commits() {
    let (dir, first, second) = create_test_repo();
    let state = request_state(&dir, &second, vec![upload(1, &first)]);
    let translator = state.git_tree_translator();

    // "three" moves from line 2 to line 4
    let moved = translator
        .get_target_commit_position_from_source_position(&first, Position::new(2, 1), false)
        .unwrap();
    assert_eq!(moved, Some(Position::new(4, 1)));

    // "one" is untouched
    let same = translator
        .get_target_commit_position_from_source_position(&first, Position::new(0, 0), false)
        .unwrap();
    assert_eq!(same, Some(Position::new(0, 0)));

    // "five" was rewritten
    let changed = translator
        .get_target_commit_position_from_source_position(&first, Position::new(4, 0), false)
        .unwrap();
    assert_eq!(changed, None);

    // and back again from the request commit
    let back = translator
        .get_target_commit_position_from_source_position(&first, Position::new(7, 2), true)
        .unwrap();
    assert_eq!(back, Some(Position::new(5, 2)));

    assert_eq!(translator.hunk_cache().len(), 1);
}

#[test]
fn test_commit_cache_against_git() {
    let (dir, first, second) = create_test_repo();
    let state = request_state(&dir, &second, Vec::new());
    let commits = state.commit_cache();

    let exists = commits
        .exists_batch(&[
            RepositoryCommit::new(1, first.clone()),
            RepositoryCommit::new(1, "0000000000000000000000000000000000000000"),
            RepositoryCommit::new(1, second.clone()),
        ])
        .unwrap();
    assert_eq!(exists, vec![true, false, true]);

    assert!(commits.is_ancestor(1, &first, &second).unwrap());
    assert!(!commits.is_ancestor(1, &second, &first).unwrap());
}

#[test]
fn test_uploads_keep_store_order() {
    let (dir, first, second) = create_test_repo();
    let state = request_state(
        &dir,
        &second,
        vec![upload(2, &second), upload(1, &first), upload(2, &first)],
    );

    let ids: Vec<i32> = state.get_cache_uploads().iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![2, 1, 2]);
    assert_eq!(state.get_upload_from_cache_map(2).unwrap().commit, first);
    assert_eq!(state.get_cache_uploads_at_index(0).unwrap().commit, second);
    assert!(state.get_cache_uploads_at_index(3).is_none());
}

#[test]
fn test_concurrent_readers_share_one_state() {
    let (dir, first, second) = create_test_repo();
    let state = request_state(&dir, &second, vec![upload(1, &first)]);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let moved = state
                    .git_tree_translator()
                    .get_target_commit_position_from_source_position(
                        &first,
                        Position::new(3, 0),
                        false,
                    )
                    .unwrap();
                assert_eq!(moved, Some(Position::new(5, 0)));
                assert!(state.get_upload_from_cache_map(1).is_some());
            });
        }
    });

    assert_eq!(state.git_tree_translator().hunk_cache().len(), 1);
}
