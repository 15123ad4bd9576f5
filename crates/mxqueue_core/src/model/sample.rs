//! Sample and crystal domain model.
//!
//! # Responsibility
//! - Describe the mounted sample and its crystallographic data.
//! - Merge optional metadata fetched from the lab information system.
//!
//! # Invariants
//! - `crystals` always holds at least one entry.
//! - LIMS identity is present iff `lims_id` is `Some`.

use crate::model::parameters::EnergyScanResult;
use serde::{Deserialize, Serialize};

/// Default pin length in millimetres.
pub const DEFAULT_HOLDER_LENGTH: f64 = 22.0;

/// Crystallographic description of one crystal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Crystal {
    pub space_group: String,
    pub cell_a: f64,
    pub cell_alpha: f64,
    pub cell_b: f64,
    pub cell_beta: f64,
    pub cell_c: f64,
    pub cell_gamma: f64,
    pub protein_acronym: String,
    /// MAD energies measured for this crystal.
    pub energy_scan_result: EnergyScanResult,
}

/// Sample record as returned by the lab information system client.
///
/// Every field is optional; only present values are merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimsSample {
    pub cell_a: Option<f64>,
    pub cell_alpha: Option<f64>,
    pub cell_b: Option<f64>,
    pub cell_beta: Option<f64>,
    pub cell_c: Option<f64>,
    pub cell_gamma: Option<f64>,
    pub protein_acronym: Option<String>,
    pub crystal_space_group: Option<String>,
    pub code: Option<String>,
    pub holder_length: Option<f64>,
    pub sample_id: Option<i64>,
    pub sample_name: Option<String>,
    pub container_sample_changer_location: Option<u32>,
    pub sample_location: Option<u32>,
}

/// Mounted or mountable sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub code: String,
    pub lims_code: String,
    pub holder_length: f64,
    pub lims_id: Option<i64>,
    pub name: String,
    /// Sample changer `(holder, position)`.
    pub location: Option<(u32, u32)>,
    pub lims_location: Option<(u32, u32)>,
    /// `holder:position`, empty when the location is unknown.
    pub loc_str: String,
    pub crystals: Vec<Crystal>,
    pub energy_scan_result: EnergyScanResult,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            code: String::new(),
            lims_code: String::new(),
            holder_length: DEFAULT_HOLDER_LENGTH,
            lims_id: None,
            name: String::new(),
            location: None,
            lims_location: None,
            loc_str: String::new(),
            crystals: vec![Crystal::default()],
            energy_scan_result: EnergyScanResult::default(),
        }
    }
}

impl Sample {
    /// Creates a sample known only by its sample changer location.
    pub fn at_location(holder: u32, position: u32) -> Self {
        let mut sample = Self::default();
        sample.init_from_sample_changer(holder, position);
        sample
    }

    pub fn has_lims_data(&self) -> bool {
        self.lims_id.is_some()
    }

    /// Acronym of the first crystal, the one used for naming and directories.
    pub fn protein_acronym(&self) -> &str {
        self.crystals
            .first()
            .map(|crystal| crystal.protein_acronym.as_str())
            .unwrap_or_default()
    }

    fn crystal_mut(&mut self) -> &mut Crystal {
        if self.crystals.is_empty() {
            self.crystals.push(Crystal::default());
        }
        &mut self.crystals[0]
    }

    /// `acronym-name` when both are known, otherwise empty.
    pub fn display_name(&self) -> String {
        let acronym = self.protein_acronym();
        if !self.name.is_empty() && !acronym.is_empty() {
            format!("{acronym}-{}", self.name)
        } else {
            String::new()
        }
    }

    /// Sets location from a sample changer scan.
    pub fn init_from_sample_changer(&mut self, holder: u32, position: u32) {
        self.location = Some((holder, position));
        self.loc_str = format!("{holder}:{position}");
    }

    /// Merges every field present in a LIMS sample record.
    ///
    /// Location is only taken when both container and sample location are
    /// present and non-zero.
    pub fn init_from_lims(&mut self, lims: &LimsSample) {
        let crystal = self.crystal_mut();
        if let Some(value) = lims.cell_a {
            crystal.cell_a = value;
        }
        if let Some(value) = lims.cell_alpha {
            crystal.cell_alpha = value;
        }
        if let Some(value) = lims.cell_b {
            crystal.cell_b = value;
        }
        if let Some(value) = lims.cell_beta {
            crystal.cell_beta = value;
        }
        if let Some(value) = lims.cell_c {
            crystal.cell_c = value;
        }
        if let Some(value) = lims.cell_gamma {
            crystal.cell_gamma = value;
        }
        if let Some(value) = &lims.protein_acronym {
            crystal.protein_acronym = value.clone();
        }
        if let Some(value) = &lims.crystal_space_group {
            crystal.space_group = value.clone();
        }

        if let Some(value) = &lims.code {
            self.lims_code = value.clone();
        }
        if let Some(value) = lims.holder_length {
            self.holder_length = value;
        }
        if let Some(value) = lims.sample_id {
            self.lims_id = Some(value);
        }
        if let Some(value) = &lims.sample_name {
            self.name = value.clone();
        }

        if let (Some(container), Some(position)) =
            (lims.container_sample_changer_location, lims.sample_location)
        {
            if container != 0 && position != 0 {
                self.lims_location = Some((container, position));
                self.init_from_sample_changer(container, position);
            }
        }
    }
}
