use super::CliError;
use super::helpers::*;
use specgroup_core::domain::{Behaviour, DetectorId, GroupKey, SpectrumNumber};
use specgroup_core::grouping::FileSystemLoader;
use specgroup_core::progress::{NoProgress, ProgressReporter};
use specgroup_core::{GroupDetectors, GroupingRequest};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct GroupArgs {
    /// Dataset to group (JSON)
    #[arg(long)]
    input: PathBuf,

    /// Where to write the grouped dataset and its summary (JSON)
    #[arg(long)]
    output: PathBuf,

    /// Grouping request file; flags below override its fields
    #[arg(long)]
    request: Option<PathBuf>,

    /// Flat (.map, .txt, ...) or XML (.xml) group file
    #[arg(long)]
    map_file: Option<PathBuf>,

    /// Grouping pattern over row indices, e.g. "0-3+7, 8:11"
    #[arg(long)]
    pattern: Option<String>,

    /// Spectrum numbers to combine into one group
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    spectra: Vec<SpectrumNumber>,

    /// Detector IDs to combine into one group
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    detectors: Vec<DetectorId>,

    /// Row indices to combine into one group
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    indices: Vec<i64>,

    /// Dataset whose detector grouping is copied (JSON)
    #[arg(long)]
    template: Option<PathBuf>,

    /// XML group IDs to leave out
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<GroupKey>,

    /// How rows of a group are combined: sum or average
    #[arg(long)]
    behaviour: Option<Behaviour>,

    /// Copy rows that no group uses into the output
    #[arg(long)]
    keep_ungrouped: bool,

    /// Number output rows with the group numbers from the source
    #[arg(long)]
    keep_group_numbers: bool,

    /// Print progress percentages to stderr
    #[arg(long)]
    progress: bool,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    summary_json: bool,
}

impl GroupArgs {
    fn merge_into(&self, mut request: GroupingRequest) -> GroupingRequest {
        if let Some(map_file) = &self.map_file {
            request.map_file = Some(map_file.clone());
        }
        if let Some(pattern) = &self.pattern {
            request.grouping_pattern = Some(pattern.clone());
        }
        if !self.spectra.is_empty() {
            request.spectra_list = self.spectra.clone();
        }
        if !self.detectors.is_empty() {
            request.detector_list = self.detectors.clone();
        }
        if !self.indices.is_empty() {
            request.workspace_index_list = self.indices.clone();
        }
        if !self.exclude.is_empty() {
            request.exclude_group_numbers = self.exclude.clone();
        }
        if let Some(behaviour) = self.behaviour {
            request.behaviour = behaviour;
        }
        if self.keep_ungrouped {
            request.keep_ungrouped = true;
        }
        if self.keep_group_numbers {
            request.ignore_group_numbers = false;
        }
        request
    }
}

pub(super) fn run_group_command(args: GroupArgs) -> Result<i32, CliError> {
    let base = match &args.request {
        Some(path) => load_request(path)?,
        None => GroupingRequest::default(),
    };
    let request = args.merge_into(base);

    let workspace = load_workspace(&args.input)?;
    let template = args.template.as_deref().map(load_workspace).transpose()?;
    let source = request
        .select_source(template.as_ref())
        .map_err(CliError::Compute)?;

    let stderr_progress = StderrProgress::default();
    let reporter: &dyn ProgressReporter = if args.progress {
        &stderr_progress
    } else {
        &NoProgress
    };
    let output = GroupDetectors::new(&FileSystemLoader)
        .with_progress(reporter)
        .run(&workspace, &source, request.options())
        .map_err(CliError::Compute)?;

    write_output(&args.output, &output)?;
    if args.summary_json {
        println!("{}", render_summary_json(&output.summary)?);
    } else {
        println!("{}", render_human_summary(&workspace.name, &output.summary));
        println!("Output: {}", args.output.display());
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::GroupArgs;
    use clap::Parser;
    use specgroup_core::GroupingRequest;
    use specgroup_core::domain::Behaviour;
    use std::path::PathBuf;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: GroupArgs,
    }

    fn parse(extra: &[&str]) -> GroupArgs {
        let args = ["specgroup", "--input", "in.json", "--output", "out.json"]
            .into_iter()
            .chain(extra.iter().copied());
        Harness::try_parse_from(args).expect("arguments should parse").args
    }

    #[test]
    fn flags_override_request_fields() {
        let request = GroupingRequest {
            map_file: Some(PathBuf::from("from-request.map")),
            spectra_list: vec![9],
            behaviour: Behaviour::Sum,
            ..GroupingRequest::default()
        };
        let merged = parse(&[
            "--map-file",
            "from-flag.xml",
            "--behaviour",
            "average",
            "--keep-group-numbers",
            "--exclude",
            "2,3",
        ])
        .merge_into(request);

        assert_eq!(merged.map_file, Some(PathBuf::from("from-flag.xml")));
        assert_eq!(merged.spectra_list, vec![9]);
        assert_eq!(merged.behaviour, Behaviour::Average);
        assert_eq!(merged.exclude_group_numbers, vec![2, 3]);
        assert!(!merged.ignore_group_numbers);
        assert!(!merged.keep_ungrouped);
    }

    #[test]
    fn comma_separated_lists_are_split() {
        let merged = parse(&["--indices", "0,2,4", "--keep-ungrouped"])
            .merge_into(GroupingRequest::default());
        assert_eq!(merged.workspace_index_list, vec![0, 2, 4]);
        assert!(merged.keep_ungrouped);
    }
}
