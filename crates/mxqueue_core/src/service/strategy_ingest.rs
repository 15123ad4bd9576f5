//! Turns a characterisation strategy into data collections.
//!
//! # Responsibility
//! - Build one data collection per sub-wedge of the first collection plan.
//! - Apply every strategy field independently; absent fields keep defaults.
//!
//! # Invariants
//! - All collections of one batch share one crystal and one processing
//!   parameter handle, both deep-copied from the reference collection.
//! - Collections are returned detached; the caller attaches and registers them.

use crate::context::collect_context::{normalise_sub_dir, CollectContext};
use crate::model::parameters::{Acquisition, AcquisitionParameters, CollectionOrigin};
use crate::model::path_template::PathTemplate;
use crate::model::sample::Sample;
use crate::model::shared;
use crate::model::strategy_result::{CollectionPlan, StrategyResult, SubWedge};
use crate::model::task::DataCollection;

/// `h·c` in keV·Å, scaled by 10^4 so energies keep four decimals.
const ENERGY_WAVELENGTH_FACTOR: f64 = 123_984.0;
const ENERGY_SCALE: f64 = 10_000.0;

/// One collection generated from a strategy, with its proposed node name.
#[derive(Debug)]
pub struct GeneratedCollection {
    pub name: String,
    pub data_collection: DataCollection,
}

/// Converts a wavelength in Å to keV, truncated to four decimals.
///
/// Returns `None` for non-positive or non-finite wavelengths.
pub fn wavelength_to_energy_kev(wavelength: f64) -> Option<f64> {
    if !wavelength.is_finite() || wavelength <= 0.0 {
        return None;
    }
    Some((ENERGY_WAVELENGTH_FACTOR / wavelength).trunc() / ENERGY_SCALE)
}

/// Whole images covering `start..end` at `width` degrees per image.
pub fn image_count(start: f64, end: f64, width: f64) -> Option<u32> {
    if !width.is_finite() || width <= 0.0 {
        return None;
    }
    let count = ((end - start).abs() / width).floor();
    (count.is_finite() && count <= f64::from(u32::MAX)).then_some(count as u32)
}

/// Builds the collections proposed by `result` for a characterisation.
///
/// `reference` is the characterisation's reference collection, `group_name`
/// names the group receiving the collections and `sample` the sample they
/// are recorded on.
pub fn data_collections_from_strategy(
    result: &StrategyResult,
    reference: &DataCollection,
    group_name: &str,
    sample: &Sample,
    context: &CollectContext,
) -> Vec<GeneratedCollection> {
    let Some(plan) = result.first_plan() else {
        return Vec::new();
    };

    let crystal = shared(reference.crystal.borrow().clone());
    let processing_parameters = shared(reference.processing_parameters.borrow().clone());
    let sub_dir = normalise_sub_dir(group_name);
    let template_base = reference_template_base(reference, sample, &sub_dir, context);

    plan.sub_wedges
        .iter()
        .map(|wedge| {
            let mut template = template_base.clone();
            if let Some(run_number) = plan.plan_number {
                template.run_number = run_number;
            }
            let name = format!("{}_{}", template.prefix(), template.run_number);
            let parameters = acquisition_parameters(reference, plan, wedge, result.screening_id);

            let mut data_collection = DataCollection::new(
                vec![Acquisition::new(template, parameters)],
                crystal.clone(),
                processing_parameters.clone(),
            );
            data_collection.origin = CollectionOrigin::Edna;
            GeneratedCollection {
                name,
                data_collection,
            }
        })
        .collect()
}

/// Template shared by every generated collection before the run number is set.
fn reference_template_base(
    reference: &DataCollection,
    sample: &Sample,
    sub_dir: &str,
    context: &CollectContext,
) -> PathTemplate {
    let mut template = PathTemplate::default();
    if let Some(reference_template) = reference.path_template() {
        let reference_template = reference_template.borrow();
        // Reference-image segment dropped, wavelength label kept.
        template.base_prefix = reference_template.base_prefix.clone();
        template.mad_prefix = reference_template.mad_prefix.clone();
        template.suffix = reference_template.suffix.clone();
    }
    template.directory = context.image_directory(sample, Some(sub_dir));
    template.process_directory = context.process_directory(sample, Some(sub_dir));
    template
}

fn acquisition_parameters(
    reference: &DataCollection,
    plan: &CollectionPlan,
    wedge: &SubWedge,
    screening_id: Option<i64>,
) -> AcquisitionParameters {
    let mut parameters = AcquisitionParameters::default();

    let centred_from = reference
        .previous_acquisition
        .as_ref()
        .or_else(|| reference.first_acquisition());
    if let Some(acquisition) = centred_from {
        parameters.centred_position = acquisition.acquisition_parameters.centred_position.clone();
    }

    if let Some(resolution) = plan.resolution {
        parameters.resolution = resolution;
    }
    if let Some(transmission) = plan.transmission {
        parameters.transmission = transmission;
    }
    if screening_id.is_some() {
        parameters.screening_id = screening_id;
    }

    if let Some(start) = wedge.rotation_axis_start {
        parameters.osc_start = start;
    }
    if let Some(width) = wedge.oscillation_width {
        parameters.osc_range = width;
    }
    if let (Some(start), Some(end), Some(width)) = (
        wedge.rotation_axis_start,
        wedge.rotation_axis_end,
        wedge.oscillation_width,
    ) {
        if let Some(count) = image_count(start, end, width) {
            parameters.num_images = count;
        }
    }
    if let Some(transmission) = wedge.transmission {
        parameters.transmission = transmission;
    }
    if let Some(energy) = wedge.wavelength.and_then(wavelength_to_energy_kev) {
        parameters.energy = energy;
    }
    if let Some(exposure_time) = wedge.exposure_time {
        parameters.exp_time = exposure_time;
    }

    parameters
}
