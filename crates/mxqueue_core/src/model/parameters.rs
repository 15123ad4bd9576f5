//! Acquisition, processing and characterisation parameter records.
//!
//! # Responsibility
//! - Hold the typed parameter records carried by queue tasks.
//! - Provide the defaults an operator sees for a fresh task.
//!
//! # Invariants
//! - `Acquisition` owns a shared `PathTemplate` handle; cloning the handle
//!   aliases the template, `Acquisition::deep_copy` does not.
//! - `CentredPosition::phi` is kept in `[0, 360)` when built from motors.

use crate::model::path_template::PathTemplate;
use crate::model::{shared, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Experiment flavour of a data collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentType {
    Sad,
    SadInverse,
    Mad,
    MadInverse,
    #[default]
    Native,
    Helical,
    /// Reference images taken for a characterisation.
    EdnaRef,
    Osc,
}

impl ExperimentType {
    /// Label understood by the execution service.
    pub fn label(self) -> &'static str {
        match self {
            Self::Sad => "SAD",
            Self::SadInverse => "SAD - Inverse Beam",
            Self::Mad => "MAD",
            Self::MadInverse => "MAD - Inverse Beam",
            Self::Native => "OSC",
            Self::Helical => "Helical",
            Self::EdnaRef => "Characterization",
            Self::Osc => "OSC",
        }
    }
}

/// Who created a data collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionOrigin {
    #[default]
    Mxcube,
    Edna,
    Workflow,
}

impl CollectionOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mxcube => "mxcube",
            Self::Edna => "edna",
            Self::Workflow => "workflow",
        }
    }
}

/// How a centred position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentringMethod {
    #[default]
    Manual,
    Loop,
    Crystal,
}

/// Search depth requested from the strategy calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyComplexity {
    /// Single sub-wedge.
    #[serde(rename = "none")]
    Single,
    /// Few sub-wedges.
    #[default]
    #[serde(rename = "min")]
    Few,
    /// Many sub-wedges.
    #[serde(rename = "full")]
    Many,
}

/// Snapshot of sample alignment motors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CentredPosition {
    pub sampx: f64,
    pub sampy: f64,
    pub phi: f64,
    pub phiz: f64,
    pub phiy: f64,
    pub zoom: f64,
    /// Reference to the image captured when the position was saved.
    pub snapshot_image: Option<String>,
    pub centring_method: CentringMethod,
}

impl CentredPosition {
    /// Builds a position from a motor-name to value map.
    ///
    /// Unknown motor names are ignored and missing ones keep their default.
    pub fn from_motor_positions(motors: &HashMap<String, f64>) -> Self {
        let mut position = Self::default();
        for (name, value) in motors {
            match name.as_str() {
                "sampx" => position.sampx = *value,
                "sampy" => position.sampy = *value,
                "phi" => position.phi = value.rem_euclid(360.0),
                "phiz" => position.phiz = *value,
                "phiy" => position.phiy = *value,
                "zoom" => position.zoom = *value,
                _ => {}
            }
        }
        position
    }

    /// Motor map for the diffractometer, without the snapshot.
    pub fn motor_positions(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("sampx".to_string(), self.sampx),
            ("sampy".to_string(), self.sampy),
            ("phi".to_string(), self.phi),
            ("phiz".to_string(), self.phiz),
            ("phiy".to_string(), self.phiy),
            ("zoom".to_string(), self.zoom),
        ])
    }
}

/// Detector and goniostat settings for one acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionParameters {
    pub first_image: u32,
    pub num_images: u32,
    pub osc_start: f64,
    pub osc_range: f64,
    pub overlap: f64,
    pub exp_time: f64,
    pub num_passes: u32,
    /// Beam energy in keV.
    pub energy: f64,
    pub resolution: f64,
    pub transmission: f64,
    pub inverse_beam: bool,
    pub shutterless: bool,
    pub take_snapshots: bool,
    pub take_dark_current: bool,
    pub skip_existing_images: bool,
    /// Screening that produced this acquisition, when generated from a strategy.
    pub screening_id: Option<i64>,
    pub centred_position: CentredPosition,
}

impl Default for AcquisitionParameters {
    fn default() -> Self {
        Self {
            first_image: 1,
            num_images: 1,
            osc_start: 0.0,
            osc_range: 0.2,
            overlap: 0.0,
            exp_time: 0.1,
            num_passes: 1,
            energy: 0.0,
            resolution: 0.0,
            transmission: 0.0,
            inverse_beam: false,
            shutterless: false,
            take_snapshots: false,
            take_dark_current: false,
            skip_existing_images: false,
            screening_id: None,
            centred_position: CentredPosition::default(),
        }
    }
}

/// One path template plus the parameters used to fill it.
#[derive(Debug)]
pub struct Acquisition {
    pub path_template: Shared<PathTemplate>,
    pub acquisition_parameters: AcquisitionParameters,
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new(PathTemplate::default(), AcquisitionParameters::default())
    }
}

impl Acquisition {
    pub fn new(path_template: PathTemplate, acquisition_parameters: AcquisitionParameters) -> Self {
        Self {
            path_template: shared(path_template),
            acquisition_parameters,
        }
    }

    /// Copies the acquisition with a fresh, unaliased path template.
    pub fn deep_copy(&self) -> Self {
        Self::new(
            self.path_template.borrow().clone(),
            self.acquisition_parameters.clone(),
        )
    }
}

/// Inputs for automatic data processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    pub space_group: String,
    pub cell_a: f64,
    pub cell_alpha: f64,
    pub cell_b: f64,
    pub cell_beta: f64,
    pub cell_c: f64,
    pub cell_gamma: f64,
    pub protein_acronym: String,
    pub num_residues: u32,
    pub process_data: bool,
    pub anomalous: bool,
    pub pdb_code: Option<String>,
    pub pdb_file: String,
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self {
            space_group: String::new(),
            cell_a: 0.0,
            cell_alpha: 0.0,
            cell_b: 0.0,
            cell_beta: 0.0,
            cell_c: 0.0,
            cell_gamma: 0.0,
            protein_acronym: String::new(),
            num_residues: 0,
            process_data: true,
            anomalous: false,
            pdb_code: None,
            pdb_file: String::new(),
        }
    }
}

impl ProcessingParameters {
    /// Unit cell as `a,b,c,alpha,beta,gamma`.
    pub fn cell_str(&self) -> String {
        [
            self.cell_a,
            self.cell_b,
            self.cell_c,
            self.cell_alpha,
            self.cell_beta,
            self.cell_gamma,
        ]
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Strategy optimisation knobs for a characterisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterisationParameters {
    pub experiment_type: ExperimentType,

    // Optimisation
    pub use_aimed_resolution: bool,
    pub aimed_resolution: f64,
    pub use_aimed_multiplicity: bool,
    pub aimed_multiplicity: f64,
    pub aimed_i_sigma: f64,
    pub aimed_completeness: f64,
    pub strategy_complexity: StrategyComplexity,
    pub induce_burn: bool,
    pub use_permitted_rotation: bool,
    pub permitted_phi_start: f64,
    pub permitted_phi_end: f64,
    pub low_res_pass_strat: bool,

    // Crystal
    pub max_crystal_vdim: f64,
    pub min_crystal_vdim: f64,
    pub max_crystal_vphi: f64,
    pub min_crystal_vphi: f64,
    pub space_group: String,

    // Characterisation type
    pub use_min_dose: bool,
    pub use_min_time: bool,
    pub min_dose: f64,
    pub min_time: f64,
    pub account_rad_damage: bool,
    pub auto_res: bool,
    pub opt_sad: bool,
    pub determine_rad_params: bool,
    pub burn_osc_start: f64,
    pub burn_osc_interval: u32,

    // Radiation damage model
    pub rad_suscept: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for CharacterisationParameters {
    fn default() -> Self {
        Self {
            experiment_type: ExperimentType::Native,
            use_aimed_resolution: false,
            aimed_resolution: 1.0,
            use_aimed_multiplicity: false,
            aimed_multiplicity: 4.0,
            aimed_i_sigma: 3.0,
            aimed_completeness: 0.99,
            strategy_complexity: StrategyComplexity::Few,
            induce_burn: false,
            use_permitted_rotation: false,
            permitted_phi_start: 0.0,
            permitted_phi_end: 360.0,
            low_res_pass_strat: false,
            max_crystal_vdim: 0.1,
            min_crystal_vdim: 0.1,
            max_crystal_vphi: 360.0,
            min_crystal_vphi: 0.0,
            space_group: String::new(),
            use_min_dose: true,
            use_min_time: false,
            min_dose: 30.0,
            min_time: 0.0,
            account_rad_damage: true,
            auto_res: false,
            opt_sad: false,
            determine_rad_params: false,
            burn_osc_start: 0.0,
            burn_osc_interval: 3,
            rad_suscept: 1.0,
            beta: 1.0,
            gamma: 0.06,
        }
    }
}

/// Energies picked from a fluorescence scan, in keV.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyScanResult {
    pub inflection: f64,
    pub peak: f64,
    pub first_remote: f64,
    pub second_remote: f64,
    /// Location of the raw scan file.
    pub data_file_path: PathTemplate,
}
