use mxqueue_core::model::parameters::{Acquisition, AcquisitionParameters};
use mxqueue_core::{
    next_available_run_number, CollectContext, DataCollection, PathTemplate, QueueService,
    TaskNodeId,
};

fn collection(prefix: &str, directory: &str, run_number: u32) -> DataCollection {
    let mut template = PathTemplate::new(prefix, directory);
    template.run_number = run_number;
    DataCollection::new(
        vec![Acquisition::new(template, AcquisitionParameters::default())],
        Default::default(),
        Default::default(),
    )
}

fn queue_with_runs(prefix: &str, runs: &[u32]) -> (QueueService, TaskNodeId) {
    let mut queue = QueueService::new(CollectContext::default());
    let root = queue.root_id();
    let group = queue.create_group(root, "group").unwrap();
    for run in runs {
        queue
            .create_data_collection(group, collection(prefix, "/data/x", *run), None)
            .unwrap();
    }
    (queue, group)
}

#[test]
fn sibling_scan_returns_highest_plus_one() {
    let (queue, group) = queue_with_runs("X", &[1, 2, 4]);
    assert_eq!(next_available_run_number(queue.tree(), group, "X"), 5);
    assert_eq!(queue.next_available_run_number(group, "X"), 5);
}

#[test]
fn sibling_scan_without_match_returns_one() {
    let (queue, group) = queue_with_runs("X", &[1, 2, 4]);
    assert_eq!(queue.next_available_run_number(group, "Y"), 1);
    assert_eq!(queue.next_available_run_number(queue.root_id(), "X"), 1);
}

#[test]
fn sibling_scan_only_looks_at_direct_children() {
    let (mut queue, group) = queue_with_runs("X", &[3]);
    let nested = queue.create_group(group, "nested").unwrap();
    queue
        .create_data_collection(nested, collection("X", "/data/x", 9), None)
        .unwrap();
    assert_eq!(queue.next_available_run_number(group, "X"), 4);
    assert_eq!(queue.next_available_run_number(nested, "X"), 10);
}

#[test]
fn registry_scan_sees_every_registered_collection() {
    let (mut queue, group) = queue_with_runs("X", &[1, 2, 4]);
    queue
        .create_data_collection(group, collection("X", "/data/other", 7), None)
        .unwrap();

    let context = queue.context();
    assert_eq!(context.free_run_number("X", "/data/x"), 5);
    assert_eq!(context.free_run_number("X", "/data/other"), 8);
    assert_eq!(context.free_run_number("Y", "/data/x"), 1);
}

#[test]
fn allocation_is_read_only() {
    let (queue, group) = queue_with_runs("X", &[2]);
    let first = queue.next_available_run_number(group, "X");
    let second = queue.next_available_run_number(group, "X");
    assert_eq!(first, second);
    assert_eq!(queue.context().free_run_number("X", "/data/x"), 3);
    assert_eq!(queue.context().free_run_number("X", "/data/x"), 3);
}

#[test]
fn mad_label_changes_the_allocation_prefix() {
    let (mut queue, group) = queue_with_runs("X", &[1]);
    let dc = queue.tree().get_children(group)[0];
    queue.set_mad_prefix(dc, Some("pk")).unwrap();

    assert_eq!(queue.next_available_run_number(group, "X"), 1);
    assert_eq!(queue.next_available_run_number(group, "pk-X"), 2);
    assert_eq!(queue.context().free_run_number("pk-X", "/data/x"), 2);
}
