//! End-to-end searches through `MainController` against a temporary tree.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use grand_search::config::ApplicationEntry;
use grand_search::searchers::{APPLICATION_GROUP, FILE_GROUP, FOLDER_GROUP};
use grand_search::{GrandSearchConfig, MainController, MatchedItemMap, TaskEvent, TaskEvents};
use search_task::{TaskState, merge};

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("projects/invoice-tool")).unwrap();
    std::fs::create_dir_all(root.join("archive")).unwrap();
    for i in 0..30 {
        std::fs::write(root.join(format!("projects/invoice-{i:02}.pdf")), b"x").unwrap();
    }
    std::fs::write(root.join("archive/invoice-old.pdf"), b"x").unwrap();
    std::fs::write(root.join("readme.md"), b"x").unwrap();
    dir
}

fn config_for(root: &std::path::Path) -> GrandSearchConfig {
    let mut config = GrandSearchConfig::default();
    config.file.roots = vec![root.to_path_buf()];
    config.file.batch_size = 4;
    config.blacklist.paths = vec![root.join("archive")];
    config.applications.entries = vec![ApplicationEntry {
        name: "Invoice Manager".into(),
        exec: "invoice-manager".into(),
        icon: "accessories-calculator".into(),
    }];
    config
}

/// Drain every batch until the task finishes, merging what was read.
async fn collect(task: &grand_search::TaskCommander, events: &mut TaskEvents) -> MatchedItemMap {
    let mut seen = MatchedItemMap::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("event within timeout");
        match event {
            Some(TaskEvent::Matched) => merge(&mut seen, task.read_buffer()),
            Some(TaskEvent::Finished) | None => break,
        }
    }
    merge(&mut seen, task.read_buffer());
    seen
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn search_reports_files_folders_and_applications() {
    let dir = fixture();
    let controller = MainController::new(config_for(dir.path())).unwrap();
    let (task, mut events) = controller.search("Invoice").unwrap();

    let seen = collect(&task, &mut events).await;
    assert_eq!(task.state(), TaskState::Finished);
    assert_eq!(seen, task.results());

    assert_eq!(seen[FILE_GROUP].len(), 30);
    assert_eq!(seen[FOLDER_GROUP].len(), 1);
    assert_eq!(seen[FOLDER_GROUP][0].name, "invoice-tool");
    assert_eq!(seen[APPLICATION_GROUP][0].item, "invoice-manager");
    assert!(
        seen[FILE_GROUP].iter().all(|i| !i.item.contains("archive")),
        "blacklisted directory leaked into results"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn result_limit_caps_file_matches() {
    let dir = fixture();
    let mut config = config_for(dir.path());
    config.file.max_results = 5;
    config.applications.enabled = false;
    let controller = MainController::new(config).unwrap();
    let (task, mut events) = controller.search("invoice").unwrap();

    let seen = collect(&task, &mut events).await;
    assert_eq!(search_task::item_count(&seen), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_matches_still_finishes() {
    let dir = fixture();
    let controller = MainController::new(config_for(dir.path())).unwrap();
    let (task, mut events) = controller.search("zzz-nothing").unwrap();

    let seen = collect(&task, &mut events).await;
    assert!(search_task::is_empty_map(&seen));
    assert!(task.is_finished());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_search_cancels_and_releases_previous_task() {
    let dir = fixture();
    let mut config = config_for(dir.path());
    config.file.enabled = false;
    config.applications.enabled = false;
    config.command.enabled = true;
    config.command.program = "sh".into();
    config.command.args = vec!["-c".into(), "echo /srv/{query}; exec sleep 30".into()];
    let controller = MainController::new(config).unwrap();

    let (first, _first_events) = controller.search("slow").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(first.state(), TaskState::Running);

    let (second, _second_events) = controller.search("fast").unwrap();
    assert_ne!(first.task_id(), second.task_id());
    assert!(first.is_finished());
    assert_eq!(
        controller.current_task().unwrap().task_id(),
        second.task_id()
    );

    // The sequential line already returned, so release does not wait for
    // the killed command.
    assert!(first.is_destroyed());
    assert_eq!(second.state(), TaskState::Running);

    controller.terminate();
}
