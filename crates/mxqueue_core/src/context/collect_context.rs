//! Experiment session context.
//!
//! # Responsibility
//! - Hold session, proposal and hutch identity for one operator session.
//! - Derive data, process and archive directories and image file names.
//! - Own the registry of live path templates.
//!
//! # Invariants
//! - Directory derivation reads the local date at call time; two calls
//!   around midnight may disagree. `base_data_directory_on` is the pure form.
//! - The hutch identity is never blank; blank input becomes
//!   `UNKNOWN_EXP_HUTCH`.
//!
//! # See also
//! - `context::config` for the start-up settings.

use crate::context::config::{
    BeamlineCapabilities, ConfigError, ContextConfig, InHouseProposal, DEFAULT_PRECISION,
    DEFAULT_SUFFIX,
};
use crate::model::parameters::Acquisition;
use crate::model::path_template::PathTemplate;
use crate::model::sample::Sample;
use crate::model::Shared;
use crate::repo::path_registry::PathTemplateRegistry;
use chrono::{Local, NaiveDate};
use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Proposal name used when no proposal is logged in.
pub const LOCAL_USER: &str = "local-user";
pub const UNKNOWN_EXP_HUTCH: &str = "unknown-exp-hutch";
pub const RAW_DATA_DIR: &str = "RAW_DATA";
pub const PROCESSED_DATA_DIR: &str = "PROCESSED_DATA";
pub const ARCHIVE_ROOT: &str = "pyarch";
pub const PREVIEW_SUFFIX: &str = "thumb.jpeg";

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Errors from context derivations.
#[derive(Debug)]
pub enum ContextError {
    /// Directory has fewer segments than the archive rewrite needs.
    DirectoryTooShallow(String),
    /// Start-up configuration was rejected.
    Config(ConfigError),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryTooShallow(directory) => write!(
                f,
                "directory `{directory}` is too shallow to derive an archive location"
            ),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::DirectoryTooShallow(_) => None,
        }
    }
}

impl From<ConfigError> for ContextError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Session-wide registry of identity, naming rules and live path templates.
#[derive(Debug)]
pub struct CollectContext {
    pub session_id: Option<i64>,
    pub proposal_code: Option<String>,
    pub proposal_number: Option<String>,
    pub proposal_id: Option<i64>,
    /// Session-wide suffix override.
    pub suffix: Option<String>,
    in_house: Vec<InHouseProposal>,
    exp_hutch: String,
    default_suffix: String,
    precision: usize,
    beamline: BeamlineCapabilities,
    registry: PathTemplateRegistry,
}

impl Default for CollectContext {
    fn default() -> Self {
        Self {
            session_id: None,
            proposal_code: None,
            proposal_number: None,
            proposal_id: None,
            suffix: None,
            in_house: Vec::new(),
            exp_hutch: UNKNOWN_EXP_HUTCH.to_string(),
            default_suffix: DEFAULT_SUFFIX.to_string(),
            precision: DEFAULT_PRECISION,
            beamline: BeamlineCapabilities::default(),
            registry: PathTemplateRegistry::new(),
        }
    }
}

impl CollectContext {
    /// Builds a context from validated configuration.
    ///
    /// # Errors
    /// - Returns `ContextError::Config` when `config` fails validation.
    pub fn from_config(config: ContextConfig) -> Result<Self, ContextError> {
        config.validate()?;
        let mut context = Self {
            session_id: config.session_id,
            proposal_code: config.proposal_code,
            proposal_number: config.proposal_number,
            proposal_id: config.proposal_id,
            suffix: config.suffix,
            in_house: config.in_house,
            exp_hutch: String::new(),
            default_suffix: config.default_suffix,
            precision: config.precision,
            beamline: config.beamline,
            registry: PathTemplateRegistry::new(),
        };
        context.set_exp_hutch(&config.exp_hutch);
        Ok(context)
    }

    pub fn exp_hutch(&self) -> &str {
        &self.exp_hutch
    }

    /// Sets the hutch identity; blank values fall back to `UNKNOWN_EXP_HUTCH`.
    pub fn set_exp_hutch(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            error!(
                "event=exp_hutch_invalid module=context status=error fallback={}",
                UNKNOWN_EXP_HUTCH
            );
            self.exp_hutch = UNKNOWN_EXP_HUTCH.to_string();
        } else {
            self.exp_hutch = trimmed.to_string();
        }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn default_suffix(&self) -> &str {
        &self.default_suffix
    }

    pub fn detector_has_shutterless(&self) -> bool {
        self.beamline.has_shutterless
    }

    pub fn tunable_wavelength(&self) -> bool {
        self.beamline.tunable_wavelength
    }

    pub fn registry(&self) -> &PathTemplateRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PathTemplateRegistry {
        &mut self.registry
    }

    pub fn add_path_template(&mut self, template: &Shared<PathTemplate>) {
        self.registry.add(template);
    }

    pub fn remove_path_template(&mut self, template: &Shared<PathTemplate>) -> bool {
        self.registry.remove(template)
    }

    /// Next free run number for `prefix` in `directory` among registered templates.
    pub fn free_run_number(&self, prefix: &str, directory: &str) -> u32 {
        self.registry.free_run_number(prefix, directory)
    }

    /// Proposal name, `code` + `number`, or `LOCAL_USER` when either is missing.
    pub fn proposal(&self) -> String {
        match (non_blank(&self.proposal_code), non_blank(&self.proposal_number)) {
            (Some(code), Some(number)) => {
                let code = if code == "ifx" { "fx" } else { code };
                format!("{code}{number}")
            }
            _ => LOCAL_USER.to_string(),
        }
    }

    /// Whether the proposal is on the in-house allow-list.
    ///
    /// Missing or empty arguments default to the logged-in proposal.
    pub fn is_inhouse(&self, code: Option<&str>, number: Option<&str>) -> bool {
        let code = code
            .filter(|code| !code.is_empty())
            .or(self.proposal_code.as_deref());
        let number = number
            .filter(|number| !number.is_empty())
            .or(self.proposal_number.as_deref());
        match (code, number) {
            (Some(code), Some(number)) => self
                .in_house
                .iter()
                .any(|entry| entry.code == code && entry.number == number),
            _ => false,
        }
    }

    /// First in-house proposal, used for staff sessions.
    pub fn inhouse_user(&self) -> Option<&InHouseProposal> {
        self.in_house.first()
    }

    /// Session data root for today's local date.
    pub fn base_data_directory(&self) -> String {
        self.base_data_directory_on(Local::now().date_naive())
    }

    /// Session data root for `date`.
    pub fn base_data_directory_on(&self, date: NaiveDate) -> String {
        let day = date.format("%Y%m%d").to_string();
        let proposal = self.proposal();
        if self.is_inhouse(None, None) {
            join_segments(&["/data", self.exp_hutch.as_str(), "inhouse", proposal.as_str(), day.as_str()])
        } else {
            join_segments(&["/data", "visitor", proposal.as_str(), self.exp_hutch.as_str(), day.as_str()])
        }
    }

    pub fn base_image_directory(&self) -> String {
        join_segments(&[self.base_data_directory().as_str(), RAW_DATA_DIR])
    }

    pub fn base_process_directory(&self) -> String {
        join_segments(&[self.base_data_directory().as_str(), PROCESSED_DATA_DIR])
    }

    /// Raw image directory of `sample`, with an optional trailing sub-directory.
    pub fn image_directory(&self, sample: &Sample, sub_dir: Option<&str>) -> String {
        self.sample_directory(&self.base_image_directory(), sample, sub_dir)
    }

    /// Processing directory of `sample`, with an optional trailing sub-directory.
    pub fn process_directory(&self, sample: &Sample, sub_dir: Option<&str>) -> String {
        self.sample_directory(&self.base_process_directory(), sample, sub_dir)
    }

    fn sample_directory(&self, base: &str, sample: &Sample, sub_dir: Option<&str>) -> String {
        let sample_path = sample_sub_path(sample);
        let mut segments = vec![base, sample_path.as_str()];
        if let Some(sub_dir) = sub_dir {
            segments.push(sub_dir);
        }
        join_segments(&segments)
    }

    /// Archive location mirroring `directory`.
    ///
    /// `/<root>/<category>/<owner>/<rest..>` becomes
    /// `/<root>/pyarch/<hutch>/<rest..>`.
    ///
    /// # Errors
    /// - `DirectoryTooShallow` when `directory` has no `<category>/<owner>` pair.
    pub fn archive_directory(&self, directory: &str) -> Result<String, ContextError> {
        let segments: Vec<&str> = directory.split('/').collect();
        let [_leading, root, _category, _owner, rest @ ..] = segments.as_slice() else {
            return Err(ContextError::DirectoryTooShallow(directory.to_string()));
        };
        let mut rewritten = vec![*root, ARCHIVE_ROOT, self.exp_hutch.as_str()];
        rewritten.extend(rest.iter().copied());
        Ok(format!("/{}", rewritten.join("/")))
    }

    /// Suffix used for a file name: argument, template, context override, default.
    fn effective_suffix<'a>(&'a self, template: &'a PathTemplate, suffix: Option<&'a str>) -> &'a str {
        suffix
            .filter(|value| !value.is_empty())
            .or_else(|| Some(template.suffix.as_str()).filter(|value| !value.is_empty()))
            .or_else(|| self.suffix.as_deref().filter(|value| !value.is_empty()))
            .unwrap_or(self.default_suffix.as_str())
    }

    /// `<prefix>_<run>_<index>.<suffix>` with the index zero-padded to the precision.
    pub fn image_file_name(&self, template: &PathTemplate, index: u32, suffix: Option<&str>) -> String {
        format!(
            "{}_{}_{:0width$}.{}",
            template.prefix(),
            template.run_number,
            index,
            self.effective_suffix(template, suffix),
            width = self.precision
        )
    }

    /// File name pattern with a `%0Nd` index placeholder, for external consumers.
    pub fn image_file_template(&self, template: &PathTemplate) -> String {
        format!(
            "{}_{}_%0{}d.{}",
            template.prefix(),
            template.run_number,
            self.precision,
            self.effective_suffix(template, None)
        )
    }

    /// Full path of image `index` of `template`.
    pub fn build_image_path(&self, template: &PathTemplate, index: u32) -> String {
        let file_name = self.image_file_name(template, index, None);
        join_segments(&[template.directory.as_str(), file_name.as_str()])
    }

    /// Full paths of every file in the numbering window of `template`.
    pub fn files_in_window(&self, template: &PathTemplate) -> Vec<String> {
        template
            .file_indices()
            .map(|index| self.build_image_path(template, index))
            .collect()
    }

    /// Archived thumbnail paths for every image of `acquisition`.
    pub fn preview_image_paths(&self, acquisition: &Acquisition) -> Result<Vec<String>, ContextError> {
        let template = acquisition.path_template.borrow();
        let archive = self.archive_directory(&template.directory)?;
        let params = &acquisition.acquisition_parameters;
        let first = params.first_image;
        let last = first.saturating_add(params.num_images);
        Ok((first..last)
            .map(|index| {
                let file_name = self.image_file_name(&template, index, Some(PREVIEW_SUFFIX));
                join_segments(&[archive.as_str(), file_name.as_str()])
            })
            .collect())
    }

    /// Prefix proposed for a new task on `sample`.
    ///
    /// LIMS samples get `[<type>-]<acronym>-<name>`, others the proposal name.
    pub fn default_prefix(&self, sample: &Sample, type_label: Option<&str>) -> String {
        if !sample.has_lims_data() {
            return self.proposal();
        }
        let base = format!("{}-{}", sample.protein_acronym(), sample.name);
        match type_label.filter(|label| !label.is_empty()) {
            Some(label) => format!("{label}-{base}"),
            None => base,
        }
    }
}

/// Directory fragment derived from a free-text name: lowercased, whitespace removed.
pub fn normalise_sub_dir(name: &str) -> String {
    WHITESPACE_RE.replace_all(name, "").to_lowercase()
}

fn sample_sub_path(sample: &Sample) -> String {
    if sample.has_lims_data() {
        join_segments(&[sample.protein_acronym(), sample.name.as_str()])
    } else {
        sample.loc_str.replace(':', "-")
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

/// Joins path segments with `/`, skipping empty ones.
fn join_segments(segments: &[&str]) -> String {
    let mut path = String::new();
    for segment in segments.iter().filter(|segment| !segment.is_empty()) {
        if path.is_empty() {
            path.push_str(segment);
            continue;
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(segment.strip_prefix('/').unwrap_or(segment));
    }
    path
}
