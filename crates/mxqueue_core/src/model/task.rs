//! Queue task variants.
//!
//! # Responsibility
//! - Define the closed set of payloads a queue tree node can carry.
//! - Answer per-variant questions (run number, prefix, owned templates)
//!   with exhaustive matches.
//!
//! # Invariants
//! - A `DataCollection` always has at least one acquisition.
//! - Crystal and processing parameters are shared handles; collections
//!   generated from one strategy batch intentionally point at the same ones.

use crate::model::parameters::{
    Acquisition, CentredPosition, CharacterisationParameters, CollectionOrigin,
    EnergyScanResult, ExperimentType, ProcessingParameters,
};
use crate::model::path_template::PathTemplate;
use crate::model::sample::{Crystal, Sample};
use crate::model::{shared, Shared};
use serde::Serialize;
use uuid::Uuid;

/// Stable identifier of a node in the queue tree.
pub type TaskNodeId = Uuid;

/// Grouping node, typically one per sample visit or workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGroup;

/// Rotation data collection.
#[derive(Debug)]
pub struct DataCollection {
    pub acquisitions: Vec<Acquisition>,
    pub crystal: Shared<Crystal>,
    pub processing_parameters: Shared<ProcessingParameters>,
    pub experiment_type: ExperimentType,
    pub origin: CollectionOrigin,
    pub previous_acquisition: Option<Acquisition>,
    pub html_report: String,
    /// Database id once the collection has been stored.
    pub id: Option<i64>,
}

impl Default for DataCollection {
    fn default() -> Self {
        Self::new(Vec::new(), shared(Crystal::default()), shared(ProcessingParameters::default()))
    }
}

impl DataCollection {
    /// Builds a collection; an empty acquisition list gets one default acquisition.
    pub fn new(
        mut acquisitions: Vec<Acquisition>,
        crystal: Shared<Crystal>,
        processing_parameters: Shared<ProcessingParameters>,
    ) -> Self {
        if acquisitions.is_empty() {
            acquisitions.push(Acquisition::default());
        }
        Self {
            acquisitions,
            crystal,
            processing_parameters,
            experiment_type: ExperimentType::default(),
            origin: CollectionOrigin::default(),
            previous_acquisition: None,
            html_report: String::new(),
            id: None,
        }
    }

    pub fn first_acquisition(&self) -> Option<&Acquisition> {
        self.acquisitions.first()
    }

    pub fn first_acquisition_mut(&mut self) -> Option<&mut Acquisition> {
        self.acquisitions.first_mut()
    }

    /// Handle of the template that names this collection.
    pub fn path_template(&self) -> Option<Shared<PathTemplate>> {
        self.first_acquisition()
            .map(|acquisition| acquisition.path_template.clone())
    }

    pub fn run_number(&self) -> Option<u32> {
        self.first_acquisition()
            .map(|acquisition| acquisition.path_template.borrow().run_number)
    }

    pub fn prefix(&self) -> Option<String> {
        self.first_acquisition()
            .map(|acquisition| acquisition.path_template.borrow().prefix())
    }

    /// Handles of every template owned by this collection.
    pub fn path_templates(&self) -> Vec<Shared<PathTemplate>> {
        self.acquisitions
            .iter()
            .map(|acquisition| acquisition.path_template.clone())
            .collect()
    }

    /// Copies every entity, sharing nothing with `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            acquisitions: self.acquisitions.iter().map(Acquisition::deep_copy).collect(),
            crystal: shared(self.crystal.borrow().clone()),
            processing_parameters: shared(self.processing_parameters.borrow().clone()),
            experiment_type: self.experiment_type,
            origin: self.origin,
            previous_acquisition: self.previous_acquisition.as_ref().map(Acquisition::deep_copy),
            html_report: self.html_report.clone(),
            id: None,
        }
    }

    /// Flat view of the first acquisition for display layers.
    pub fn summary(&self) -> Option<DataCollectionSummary> {
        let acquisition = self.first_acquisition()?;
        let template = acquisition.path_template.borrow();
        let params = &acquisition.acquisition_parameters;
        Some(DataCollectionSummary {
            prefix: template.prefix(),
            run_number: template.run_number,
            path: template.directory.clone(),
            first_image: params.first_image,
            num_images: params.num_images,
            osc_start: params.osc_start,
            osc_range: params.osc_range,
            overlap: params.overlap,
            exp_time: params.exp_time,
            num_passes: params.num_passes,
            energy: params.energy,
            resolution: params.resolution,
            transmission: params.transmission,
            shutterless: params.shutterless,
            inverse_beam: params.inverse_beam,
            centred_position: params.centred_position.clone(),
            snapshot: params.centred_position.snapshot_image.clone(),
        })
    }
}

/// Display record of a data collection's first acquisition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataCollectionSummary {
    pub prefix: String,
    pub run_number: u32,
    pub path: String,
    pub first_image: u32,
    pub num_images: u32,
    pub osc_start: f64,
    pub osc_range: f64,
    pub overlap: f64,
    pub exp_time: f64,
    pub num_passes: u32,
    pub energy: f64,
    pub resolution: f64,
    pub transmission: f64,
    pub shutterless: bool,
    pub inverse_beam: bool,
    pub centred_position: CentredPosition,
    pub snapshot: Option<String>,
}

/// Low-dose reference collection used to plan a full collection.
#[derive(Debug, Default)]
pub struct Characterisation {
    /// Owned by value; not a node of the queue tree.
    pub reference_collection: DataCollection,
    pub parameters: CharacterisationParameters,
    pub html_report: Option<String>,
    pub characterisation_software: Option<String>,
}

impl Characterisation {
    pub fn new(reference_collection: DataCollection, parameters: CharacterisationParameters) -> Self {
        Self {
            reference_collection,
            parameters,
            html_report: None,
            characterisation_software: None,
        }
    }
}

/// Fluorescence energy scan around an absorption edge.
#[derive(Debug)]
pub struct EnergyScan {
    pub element_symbol: Option<String>,
    pub edge: Option<String>,
    pub path_template: Shared<PathTemplate>,
    pub result: EnergyScanResult,
}

impl Default for EnergyScan {
    fn default() -> Self {
        Self::new(None, None, PathTemplate::default())
    }
}

impl EnergyScan {
    pub fn new(element_symbol: Option<String>, edge: Option<String>, path_template: PathTemplate) -> Self {
        Self {
            element_symbol,
            edge,
            path_template: shared(path_template),
            result: EnergyScanResult::default(),
        }
    }
}

/// Centring step executed before the task it refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleCentring {
    pub task: Option<TaskNodeId>,
}

/// Payload of one queue tree node.
#[derive(Debug)]
pub enum TaskKind {
    /// Top of the queue; has no payload and no parent.
    Root,
    Group(TaskGroup),
    Sample(Box<Sample>),
    DataCollection(DataCollection),
    Characterisation(Box<Characterisation>),
    EnergyScan(EnergyScan),
    SampleCentring(SampleCentring),
}

impl TaskKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Group(_) => "task_group",
            Self::Sample(_) => "sample",
            Self::DataCollection(_) => "data_collection",
            Self::Characterisation(_) => "characterisation",
            Self::EnergyScan(_) => "energy_scan",
            Self::SampleCentring(_) => "sample_centring",
        }
    }

    pub fn run_number(&self) -> Option<u32> {
        match self {
            Self::DataCollection(dc) => dc.run_number(),
            Self::Characterisation(characterisation) => characterisation.reference_collection.run_number(),
            Self::EnergyScan(scan) => Some(scan.path_template.borrow().run_number),
            Self::Root | Self::Group(_) | Self::Sample(_) | Self::SampleCentring(_) => None,
        }
    }

    pub fn prefix(&self) -> Option<String> {
        match self {
            Self::DataCollection(dc) => dc.prefix(),
            Self::Characterisation(characterisation) => characterisation.reference_collection.prefix(),
            Self::EnergyScan(scan) => Some(scan.path_template.borrow().prefix()),
            Self::Root | Self::Group(_) | Self::Sample(_) | Self::SampleCentring(_) => None,
        }
    }

    /// Handles of every path template this payload owns.
    pub fn path_templates(&self) -> Vec<Shared<PathTemplate>> {
        match self {
            Self::DataCollection(dc) => dc.path_templates(),
            Self::Characterisation(characterisation) => characterisation.reference_collection.path_templates(),
            Self::EnergyScan(scan) => vec![scan.path_template.clone()],
            Self::Root | Self::Group(_) | Self::Sample(_) | Self::SampleCentring(_) => Vec::new(),
        }
    }

    /// Template whose numbering window lists the files this task writes.
    pub fn image_path_template(&self) -> Option<Shared<PathTemplate>> {
        match self {
            Self::DataCollection(dc) => dc.path_template(),
            Self::Characterisation(characterisation) => characterisation.reference_collection.path_template(),
            Self::Root
            | Self::Group(_)
            | Self::Sample(_)
            | Self::EnergyScan(_)
            | Self::SampleCentring(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataCollection, EnergyScan, TaskKind};
    use crate::model::path_template::PathTemplate;
    use std::rc::Rc;

    #[test]
    fn new_collection_gets_default_acquisition() {
        let dc = DataCollection::default();
        assert_eq!(dc.acquisitions.len(), 1);
        assert_eq!(dc.run_number(), Some(1));
    }

    #[test]
    fn deep_copy_shares_no_entity() {
        let dc = DataCollection::default();
        let copy = dc.deep_copy();
        assert!(!Rc::ptr_eq(&dc.crystal, &copy.crystal));
        assert!(!Rc::ptr_eq(&dc.processing_parameters, &copy.processing_parameters));
        copy.crystal.borrow_mut().protein_acronym = "lyso".to_string();
        assert_eq!(dc.crystal.borrow().protein_acronym, "");
    }

    #[test]
    fn energy_scan_reports_its_template() {
        let scan = EnergyScan::new(
            Some("Se".to_string()),
            Some("K".to_string()),
            PathTemplate::new("scan", "/data"),
        );
        let kind = TaskKind::EnergyScan(scan);
        assert_eq!(kind.prefix().as_deref(), Some("scan"));
        assert_eq!(kind.path_templates().len(), 1);
        assert!(kind.image_path_template().is_none());
    }

    #[test]
    fn grouping_variants_carry_no_run_number() {
        assert_eq!(TaskKind::Root.run_number(), None);
        assert_eq!(TaskKind::Group(Default::default()).prefix(), None);
    }
}
