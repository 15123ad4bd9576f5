//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mxqueue_core` linkage.
//! - Start the queue file logger before any queue work.
//! - Build a small demonstration queue and print the request it produces.

use clap::Parser;
use log::info;
use mxqueue_core::model::parameters::{Acquisition, AcquisitionParameters};
use mxqueue_core::model::sample::{LimsSample, Sample};
use mxqueue_core::{
    default_log_level, init_logging, CollectContext, ContextConfig, DataCollection, PathTemplate,
    QueueService,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build a demo experiment queue", long_about = None)]
struct Args {
    /// JSON context config; a built-in demo proposal is used when omitted.
    config: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mxqueue-logs"))
    }

    fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ContextConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(ContextConfig::from_json_str(&text)?)
        }
        None => Ok(ContextConfig {
            session_id: Some(1),
            proposal_code: Some("mx".to_string()),
            proposal_number: Some("415".to_string()),
            exp_hutch: "id30a1".to_string(),
            ..ContextConfig::default()
        }),
    }
}

fn run(config_path: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    info!(
        "event=cli_run module=cli status=start config={}",
        config_path.map_or("builtin".into(), |path| path.display().to_string())
    );
    let context = CollectContext::from_config(load_config(config_path)?)?;
    let mut queue = QueueService::new(context);
    let root = queue.root_id();

    let mut sample = Sample::at_location(1, 1);
    sample.init_from_lims(&LimsSample {
        protein_acronym: Some("lyso".to_string()),
        sample_name: Some("xtal1".to_string()),
        sample_id: Some(1),
        ..LimsSample::default()
    });
    let directory = queue.context().image_directory(&sample, None);
    let process_directory = queue.context().process_directory(&sample, None);
    let prefix = queue.context().default_prefix(&sample, None);

    let sample_id = queue.create_sample(root, sample)?;
    let group_id = queue.create_group(sample_id, "Demo group")?;

    let mut template = PathTemplate::new(prefix.as_str(), directory.as_str());
    template.process_directory = process_directory;
    template.run_number = queue.context().free_run_number(&prefix, &directory);
    let parameters = AcquisitionParameters {
        num_images: 10,
        ..AcquisitionParameters::default()
    };
    let dc = DataCollection::new(
        vec![Acquisition::new(template, parameters)],
        Default::default(),
        Default::default(),
    );
    let dc_id = queue.create_data_collection(group_id, dc, None)?;

    print!("{}", queue.pretty_print());
    println!("{}", serde_json::to_string_pretty(&queue.collect_request(dc_id)?)?);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    println!("mxqueue_core ping={}", mxqueue_core::ping());
    println!("mxqueue_core version={}", mxqueue_core::core_version());

    let log_dir = args.log_dir();
    if let Err(err) = init_logging(args.log_level(), &log_dir.to_string_lossy()) {
        eprintln!("mxqueue_cli error: {err}");
        return ExitCode::FAILURE;
    }

    match run(args.config.as_ref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mxqueue_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_config, Args};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn args_default_to_builtin_config_and_temp_log_dir() {
        let args = Args::try_parse_from(["mxqueue_cli"]).unwrap();
        assert!(args.config.is_none());
        assert_eq!(args.log_dir(), std::env::temp_dir().join("mxqueue-logs"));
        assert_eq!(args.log_level(), mxqueue_core::default_log_level());
    }

    #[test]
    fn args_accept_log_overrides_and_config_path() {
        let args = Args::try_parse_from([
            "mxqueue_cli",
            "--log-dir",
            "/var/log/mxqueue",
            "--log-level",
            "warn",
            "context.json",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("context.json")));
        assert_eq!(args.log_dir(), PathBuf::from("/var/log/mxqueue"));
        assert_eq!(args.log_level(), "warn");
    }

    #[test]
    fn builtin_config_is_valid() {
        let config = load_config(None).unwrap();
        assert_eq!(config.exp_hutch, "id30a1");
        assert!(mxqueue_core::CollectContext::from_config(config).is_ok());
    }
}
