//! Sample target bound by the `cliarg` binary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use cliarg_core::{ArgType, CliSpec, Param, SpecError, ValueType, property};
use serde::{Deserialize, Serialize};

/// How files are copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    #[default]
    Copy,
    Link,
    Move,
}

impl ArgType for CopyMode {
    fn value_type() -> ValueType {
        ValueType::String
    }
}

/// A file copy request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyJob {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub retries: u32,
    pub verbose: bool,
    pub dry_run: bool,
    pub mode: CopyMode,
    pub exclude: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Specification for [`CopyJob`]; new targets start as clones of `defaults`.
pub fn copy_job_spec(defaults: CopyJob) -> Result<CliSpec<CopyJob>, SpecError> {
    CliSpec::builder()
        .positional(
            Param::new("source", property!(CopyJob, source))
                .required()
                .description("file or directory to copy"),
        )
        .positional(
            Param::new("destination", property!(CopyJob, destination))
                .description("where to put it"),
        )
        .option(Param::new("retries", property!(CopyJob, retries)))
        .option(Param::new("verbose", property!(CopyJob, verbose)))
        .option(Param::new("dry-run", property!(CopyJob, dry_run)))
        .option(Param::new("mode", property!(CopyJob, mode)).description("copy, link or move"))
        .option(Param::new("exclude", property!(CopyJob, exclude)))
        .option(Param::new("labels", property!(CopyJob, labels)))
        .factory(move || defaults.clone())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliarg_core::CliParser;

    #[test]
    fn test_full_job() {
        let spec = copy_job_spec(CopyJob::default()).unwrap();
        let args = [
            "src/", "dst/", "--retries", "3", "-verbose", "--dry-run=true", "--mode=move",
            "--exclude", "*.tmp,*.bak", "--labels", r#""owner": "ops""#,
        ];

        let job = CliParser::new(&spec, args, 0).unwrap().parse().into_result().unwrap();

        assert_eq!(job.source, PathBuf::from("src/"));
        assert_eq!(job.destination, Some(PathBuf::from("dst/")));
        assert_eq!(job.retries, 3);
        assert!(job.verbose);
        assert!(job.dry_run);
        assert_eq!(job.mode, CopyMode::Move);
        assert_eq!(job.exclude, vec!["*.tmp", "*.bak"]);
        assert_eq!(job.labels["owner"], "ops");
    }

    #[test]
    fn test_defaults_seed_the_target() {
        let defaults = CopyJob {
            retries: 5,
            mode: CopyMode::Link,
            ..Default::default()
        };
        let spec = copy_job_spec(defaults).unwrap();

        let outcome = CliParser::new(&spec, ["a"], 0).unwrap().parse();

        assert!(!outcome.has_error());
        assert_eq!(outcome.target().retries, 5);
        assert_eq!(outcome.target().mode, CopyMode::Link);
    }

    #[test]
    fn test_bad_mode() {
        let spec = copy_job_spec(CopyJob::default()).unwrap();

        let outcome = CliParser::new(&spec, ["--mode", "zip"], 0).unwrap().parse();

        assert_eq!(outcome.report().missing_params(), ["source".to_string()]);
        assert!(outcome.report().error_messages().contains_key("mode"));
        assert_eq!(outcome.target().mode, CopyMode::Copy);
    }
}
