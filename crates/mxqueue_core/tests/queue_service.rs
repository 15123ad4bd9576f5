use mxqueue_core::context::config::InHouseProposal;
use mxqueue_core::model::parameters::{
    Acquisition, AcquisitionParameters, CharacterisationParameters,
};
use mxqueue_core::model::sample::{LimsSample, Sample};
use mxqueue_core::model::task::EnergyScan;
use mxqueue_core::model::Shared;
use mxqueue_core::{
    CollectContext, ContextConfig, DataCollection, PathTemplate, QueueService, QueueServiceError,
    TaskKind, TaskNodeId, TreeError,
};
use std::rc::Rc;

fn queue() -> QueueService {
    let config = ContextConfig {
        proposal_code: Some("mx".to_string()),
        proposal_number: Some("123".to_string()),
        exp_hutch: "id30a1".to_string(),
        in_house: vec![InHouseProposal {
            code: "mx".to_string(),
            number: "123".to_string(),
        }],
        ..ContextConfig::default()
    };
    QueueService::new(CollectContext::from_config(config).unwrap())
}

fn collection(prefix: &str, run_number: u32) -> DataCollection {
    let mut template = PathTemplate::new(prefix, "/data/x");
    template.run_number = run_number;
    DataCollection::new(
        vec![Acquisition::new(template, AcquisitionParameters::default())],
        Default::default(),
        Default::default(),
    )
}

fn lims_sample() -> Sample {
    let mut sample = Sample::at_location(1, 3);
    sample.init_from_lims(&LimsSample {
        protein_acronym: Some("thau".to_string()),
        sample_name: Some("s7".to_string()),
        sample_id: Some(99),
        ..LimsSample::default()
    });
    sample
}

fn data_collection(queue: &QueueService, id: TaskNodeId) -> &DataCollection {
    match &queue.node(id).unwrap().kind {
        TaskKind::DataCollection(dc) => dc,
        other => panic!("expected data collection, got {}", other.kind_name()),
    }
}

fn template_of(queue: &QueueService, id: TaskNodeId) -> Shared<PathTemplate> {
    queue
        .node(id)
        .unwrap()
        .kind
        .path_templates()
        .into_iter()
        .next()
        .unwrap()
}

#[test]
fn create_registers_templates_of_every_owning_variant() {
    let mut queue = queue();
    let root = queue.root_id();
    let group = queue.create_group(root, "g").unwrap();
    let dc = queue
        .create_data_collection(group, collection("a", 1), None)
        .unwrap();
    let characterisation = queue
        .create_characterisation(
            group,
            collection("b", 1),
            CharacterisationParameters::default(),
            None,
        )
        .unwrap();
    let scan = queue
        .create_energy_scan(
            group,
            EnergyScan::new(Some("Se".to_string()), Some("K".to_string()), PathTemplate::new("c", "/data/x")),
            None,
        )
        .unwrap();
    queue.create_sample_centring(group, Some(dc)).unwrap();

    let registry = queue.context().registry();
    assert_eq!(registry.len(), 3);
    for id in [dc, characterisation, scan] {
        assert!(registry.contains(&template_of(&queue, id)));
    }
    assert_eq!(queue.node(dc).unwrap().name, "a_1");
    assert_eq!(queue.node(scan).unwrap().name, "c_1");
}

#[test]
fn remove_unregisters_templates_of_whole_subtree() {
    let mut queue = queue();
    let root = queue.root_id();
    let outer = queue.create_group(root, "outer").unwrap();
    let inner = queue.create_group(outer, "inner").unwrap();
    let top_dc = queue
        .create_data_collection(outer, collection("x", 1), None)
        .unwrap();
    let deep_dc = queue
        .create_data_collection(inner, collection("x", 2), None)
        .unwrap();
    let deep_char = queue
        .create_characterisation(
            inner,
            collection("y", 1),
            CharacterisationParameters::default(),
            None,
        )
        .unwrap();
    let kept = queue
        .create_data_collection(root, collection("x", 3), None)
        .unwrap();

    let removed_templates: Vec<_> = [top_dc, deep_dc, deep_char]
        .iter()
        .map(|id| template_of(&queue, *id))
        .collect();
    let kept_template = template_of(&queue, kept);

    let removed = queue.remove(outer).unwrap();
    assert_eq!(removed.len(), 5);
    assert_eq!(queue.tree().get_children(root), &[kept]);

    let registry = queue.context().registry();
    for template in &removed_templates {
        assert!(!registry.contains(template));
    }
    assert!(registry.contains(&kept_template));
    assert_eq!(registry.len(), 1);
    assert_eq!(queue.context().free_run_number("x", "/data/x"), 4);
}

#[test]
fn remove_rejects_unknown_nodes() {
    let mut queue = queue();
    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        queue.remove(missing).unwrap_err(),
        QueueServiceError::Tree(TreeError::NodeNotFound(id)) if id == missing
    ));
}

#[test]
fn copy_data_collection_creates_uncollected_sibling_with_next_run() {
    let mut queue = queue();
    let root = queue.root_id();
    let group = queue.create_group(root, "g").unwrap();
    let source = queue
        .create_data_collection(group, collection("x", 3), Some("low dose pass"))
        .unwrap();
    queue.set_executed(source, true).unwrap();

    let copy = queue.copy_data_collection(source).unwrap();

    assert_eq!(queue.tree().get_children(group), &[source, copy]);
    assert!(queue.node(source).unwrap().is_collected());
    assert!(!queue.node(copy).unwrap().is_collected());
    assert_eq!(data_collection(&queue, source).run_number(), Some(3));
    assert_eq!(data_collection(&queue, copy).run_number(), Some(4));
    assert_eq!(queue.node(copy).unwrap().name, "low dose pass");

    let source_dc = data_collection(&queue, source);
    let copy_dc = data_collection(&queue, copy);
    assert!(!Rc::ptr_eq(&source_dc.crystal, &copy_dc.crystal));
    assert!(!Rc::ptr_eq(
        &source_dc.processing_parameters,
        &copy_dc.processing_parameters
    ));

    let registry = queue.context().registry();
    assert!(registry.contains(&template_of(&queue, source)));
    assert!(registry.contains(&template_of(&queue, copy)));
    assert_eq!(registry.templates_for_prefix("x").len(), 2);
}

#[test]
fn copy_characterisation_bumps_reference_run_number() {
    let mut queue = queue();
    let root = queue.root_id();
    let parameters = CharacterisationParameters {
        aimed_resolution: 1.5,
        ..CharacterisationParameters::default()
    };
    let source = queue
        .create_characterisation(root, collection("ref-x", 1), parameters, None)
        .unwrap();

    let copy = queue.copy_characterisation(source).unwrap();
    assert_eq!(queue.node(copy).unwrap().name, queue.node(source).unwrap().name);

    let TaskKind::Characterisation(copied) = &queue.node(copy).unwrap().kind else {
        panic!("copy is not a characterisation");
    };
    assert_eq!(copied.reference_collection.run_number(), Some(2));
    assert_eq!(copied.parameters.aimed_resolution, 1.5);
    assert_eq!(queue.context().registry().len(), 2);
    assert!(matches!(
        queue.copy_data_collection(source).unwrap_err(),
        QueueServiceError::WrongKind { expected: "data_collection", found: "characterisation", .. }
    ));
}

#[test]
fn rename_moves_child_collections_into_new_sub_directory() {
    let mut queue = queue();
    let root = queue.root_id();
    let sample = queue.create_sample(root, lims_sample()).unwrap();
    let group = queue.create_group(sample, "Group 1").unwrap();
    let dc = queue
        .create_data_collection(group, collection("x", 1), None)
        .unwrap();
    let characterisation = queue
        .create_characterisation(
            group,
            collection("y", 1),
            CharacterisationParameters::default(),
            None,
        )
        .unwrap();

    queue.rename(group, "Wedge B").unwrap();

    assert_eq!(queue.node(group).unwrap().name, "Wedge B");
    let base_images = queue.context().base_image_directory();
    let base_process = queue.context().base_process_directory();
    for id in [dc, characterisation] {
        let template = template_of(&queue, id);
        let template = template.borrow();
        assert_eq!(template.directory, format!("{base_images}/thau/s7/wedgeb"));
        assert_eq!(template.process_directory, format!("{base_process}/thau/s7/wedgeb"));
    }
}

#[test]
fn rename_outside_sample_only_changes_name() {
    let mut queue = queue();
    let root = queue.root_id();
    let group = queue.create_group(root, "g").unwrap();
    let dc = queue
        .create_data_collection(group, collection("x", 1), None)
        .unwrap();

    queue.rename(group, "renamed").unwrap();
    assert_eq!(queue.node(group).unwrap().name, "renamed");
    assert_eq!(template_of(&queue, dc).borrow().directory, "/data/x");
    assert!(queue.rename(root, "root").is_err());
}

#[test]
fn sample_node_is_named_after_lims_identity_or_location() {
    let mut queue = queue();
    let root = queue.root_id();
    let named = queue.create_sample(root, lims_sample()).unwrap();
    let unnamed = queue.create_sample(root, Sample::at_location(4, 2)).unwrap();
    assert_eq!(queue.node(named).unwrap().name, "thau-s7");
    assert_eq!(queue.node(unnamed).unwrap().name, "4:2");
}

#[test]
fn set_mad_prefix_relabels_first_template() {
    let mut queue = queue();
    let root = queue.root_id();
    let dc = queue
        .create_data_collection(root, collection("x", 1), None)
        .unwrap();

    queue.set_mad_prefix(dc, Some("ip")).unwrap();
    assert_eq!(data_collection(&queue, dc).prefix().as_deref(), Some("ip-x"));
    assert_eq!(queue.context().registry().templates_for_prefix("ip-x").len(), 1);

    queue.set_mad_prefix(dc, None).unwrap();
    assert_eq!(data_collection(&queue, dc).prefix().as_deref(), Some("x"));
}

#[test]
fn files_to_be_written_cover_numbering_window() {
    let mut queue = queue();
    let root = queue.root_id();
    let mut dc = collection("x", 2);
    {
        let template = dc.path_template().unwrap();
        let mut template = template.borrow_mut();
        template.start_num = 5;
        template.num_files = 3;
    }
    dc.acquisitions[0].acquisition_parameters.num_images = 3;
    let dc = queue.create_data_collection(root, dc, None).unwrap();
    let group = queue.create_group(root, "g").unwrap();

    assert_eq!(
        queue.files_to_be_written(dc).unwrap(),
        vec![
            "/data/x/x_2_0005.img".to_string(),
            "/data/x/x_2_0006.img".to_string(),
            "/data/x/x_2_0007.img".to_string(),
        ]
    );
    assert!(queue.files_to_be_written(group).unwrap().is_empty());
}

#[test]
fn pretty_print_lists_every_attached_node() {
    let mut queue = queue();
    let root = queue.root_id();
    let group = queue.create_group(root, "g").unwrap();
    queue
        .create_data_collection(group, collection("x", 1), None)
        .unwrap();

    let dump = queue.pretty_print();
    assert_eq!(dump.lines().count(), 3);
    assert!(dump.contains("\t\t<data_collection "));
}
