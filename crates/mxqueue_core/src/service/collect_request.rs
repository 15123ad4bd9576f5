//! Execution-service request mapping.
//!
//! # Responsibility
//! - Flatten a data collection into the record the execution service reads.
//!
//! # Invariants
//! - Mapping is pure; nothing in the collection or context is mutated.
//! - Key names are fixed by the execution service and must not change.

use crate::context::collect_context::CollectContext;
use crate::model::parameters::Acquisition;
use crate::model::task::DataCollection;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where the images of a request are written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub directory: String,
    pub prefix: String,
    pub run_number: u32,
    pub process_directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReference {
    pub spacegroup: String,
    /// `a,b,c,alpha,beta,gamma`.
    pub cell: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionRange {
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OscillationSequence {
    pub exposure_time: f64,
    #[serde(rename = "kappaStart")]
    pub kappa_start: f64,
    #[serde(rename = "phiStart")]
    pub phi_start: f64,
    pub start_image_number: u32,
    pub number_of_images: u32,
    pub overlap: f64,
    pub start: f64,
    pub range: f64,
    pub number_of_passes: u32,
}

/// Request record consumed by the execution service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectRequest {
    pub comment: String,
    pub helical: u8,
    pub motors: BTreeMap<String, f64>,
    pub take_snapshots: bool,
    pub fileinfo: FileInfo,
    pub in_queue: u8,
    pub detector_mode: u8,
    pub shutterless: bool,
    #[serde(rename = "sessionId")]
    pub session_id: Option<i64>,
    pub do_inducedraddam: bool,
    pub sample_reference: SampleReference,
    /// `"True"` or `"False"`.
    pub processing: String,
    pub residues: u32,
    /// Dark current is always requested.
    pub dark: String,
    pub scan4d: u8,
    pub resolution: ResolutionRange,
    pub transmission: f64,
    pub energy: f64,
    pub input_files: u8,
    pub oscillation_sequence: Vec<OscillationSequence>,
    pub nb_sum_images: u32,
    #[serde(rename = "EDNA_files_dir")]
    pub edna_files_dir: String,
    pub anomalous: bool,
    pub file_exists: u8,
    pub experiment_type: String,
    pub skip_images: bool,
}

fn flag_string(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

/// Maps the first acquisition of `data_collection` to a request.
///
/// A collection without acquisitions maps as if it held a default one.
pub fn to_collect_request(data_collection: &DataCollection, context: &CollectContext) -> CollectRequest {
    let fallback;
    let acquisition = match data_collection.first_acquisition() {
        Some(acquisition) => acquisition,
        None => {
            fallback = Acquisition::default();
            &fallback
        }
    };
    let template = acquisition.path_template.borrow();
    let params = &acquisition.acquisition_parameters;
    let processing = data_collection.processing_parameters.borrow();

    CollectRequest {
        comment: String::new(),
        helical: 0,
        motors: BTreeMap::new(),
        take_snapshots: params.take_snapshots,
        fileinfo: FileInfo {
            directory: template.directory.clone(),
            prefix: template.prefix(),
            run_number: template.run_number,
            process_directory: template.process_directory.clone(),
        },
        in_queue: 0,
        detector_mode: 0,
        shutterless: params.shutterless,
        session_id: context.session_id,
        do_inducedraddam: false,
        sample_reference: SampleReference {
            spacegroup: processing.space_group.clone(),
            cell: processing.cell_str(),
        },
        processing: flag_string(processing.process_data),
        residues: processing.num_residues,
        dark: flag_string(true),
        scan4d: 0,
        resolution: ResolutionRange {
            upper: params.resolution,
        },
        transmission: params.transmission,
        energy: params.energy,
        input_files: 1,
        oscillation_sequence: vec![OscillationSequence {
            exposure_time: params.exp_time,
            kappa_start: 0.0,
            phi_start: 0.0,
            start_image_number: params.first_image,
            number_of_images: params.num_images,
            overlap: params.overlap,
            start: params.osc_start,
            range: params.osc_range,
            number_of_passes: params.num_passes,
        }],
        nb_sum_images: 0,
        edna_files_dir: String::new(),
        anomalous: processing.anomalous,
        file_exists: 0,
        experiment_type: data_collection.experiment_type.label().to_string(),
        skip_images: params.skip_existing_images,
    }
}
