//! One grouping invocation, driven through its lifecycle states.

use crate::assembler::{AssemblyOptions, GroupingOutput, GroupingSummary, assemble};
use crate::domain::{
    Behaviour, GroupingError, GroupingResult, GroupingState, IdentifierMaps, RowKind, Workspace,
};
use crate::grouping::{FileSystemLoader, GroupFileLoader, GroupSpecParser, GroupingSource};
use crate::progress::{
    COMBINING_WEIGHT, NoProgress, PARSING_WEIGHT, PhaseProgress, ProgressReporter,
};
use crate::resolver::resolve;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingOptions {
    pub behaviour: Behaviour,
    pub keep_ungrouped: bool,
    /// Number groups 1, 2, 3, ... in source order instead of keeping the
    /// numbers the source assigns.
    pub ignore_group_numbers: bool,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            behaviour: Behaviour::Sum,
            keep_ungrouped: false,
            ignore_group_numbers: true,
        }
    }
}

pub struct GroupDetectors<'a> {
    loader: &'a dyn GroupFileLoader,
    reporter: &'a dyn ProgressReporter,
    state: GroupingState,
}

impl<'a> GroupDetectors<'a> {
    pub fn new(loader: &'a dyn GroupFileLoader) -> Self {
        Self {
            loader,
            reporter: &NoProgress,
            state: GroupingState::Idle,
        }
    }

    pub fn with_progress(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> GroupingState {
        self.state
    }

    /// Runs parse, resolve, combine and assemble over `workspace`. No partial
    /// output is returned on failure or cancellation.
    pub fn run(
        &mut self,
        workspace: &Workspace,
        source: &GroupingSource<'_>,
        options: GroupingOptions,
    ) -> GroupingResult<GroupingOutput> {
        self.state = GroupingState::Idle;
        self.run_phases(workspace, source, options)
            .map_err(|error| self.fail(error))
    }

    fn run_phases(
        &mut self,
        workspace: &Workspace,
        source: &GroupingSource<'_>,
        options: GroupingOptions,
    ) -> GroupingResult<GroupingOutput> {
        self.transition(GroupingState::Parsing);
        if workspace.kind() == RowKind::GroupNumbers {
            return Err(GroupingError::type_mismatch(
                "TYPE.ROW_KIND",
                format!(
                    "'{}' is a group-number dataset; it can only be used as a template",
                    workspace.name
                ),
            ));
        }
        let lookup = IdentifierMaps::from_workspace(workspace);
        let parsing = PhaseProgress::new(self.reporter, "parsing", 0.0, PARSING_WEIGHT);
        let parsed = GroupSpecParser::new(workspace, &lookup, self.loader)
            .ignore_group_numbers(options.ignore_group_numbers)
            .parse(source, &parsing)?;
        parsing.finish();

        self.transition(GroupingState::Resolving);
        let resolved = resolve(parsed.groups, workspace.row_count())?;
        debug_assert_eq!(resolved.used, parsed.used);

        self.transition(GroupingState::Combining);
        let combining =
            PhaseProgress::new(self.reporter, "combining", PARSING_WEIGHT, COMBINING_WEIGHT);
        let assembled = assemble(
            &resolved.groups,
            &resolved.used,
            workspace,
            AssemblyOptions {
                keep_ungrouped: options.keep_ungrouped,
                sequential_numbers: options.ignore_group_numbers,
                behaviour: options.behaviour,
            },
            &combining,
        )?;

        self.transition(GroupingState::Assembling);
        combining.interruption_point()?;
        let summary = GroupingSummary {
            group_count: resolved.groups.len(),
            passthrough_count: assembled.passthrough_count,
            skipped_references: parsed.skipped_references,
            duplicate_uses: resolved.duplicate_uses,
        };
        let output = GroupingOutput {
            workspace: Workspace {
                name: workspace.name.clone(),
                rows: assembled.rows,
            },
            summary,
            event_average_counts: assembled.event_average_counts,
        };
        combining.finish();

        self.transition(GroupingState::Done);
        info!(
            workspace = %workspace.name,
            source = %source.describe(),
            behaviour = %options.behaviour,
            groups = output.summary.group_count,
            passthrough = output.summary.passthrough_count,
            skipped = output.summary.skipped_references,
            duplicates = output.summary.duplicate_uses,
            "grouping finished"
        );
        Ok(output)
    }

    fn transition(&mut self, next: GroupingState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid grouping transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "grouping state");
        self.state = next;
    }

    fn fail(&mut self, error: GroupingError) -> GroupingError {
        let next = if error.is_cancelled() {
            GroupingState::Cancelled
        } else {
            GroupingState::Failed
        };
        self.transition(next);
        error
    }
}

/// Groups `workspace` reading any group file from disk.
pub fn group_workspace(
    workspace: &Workspace,
    source: &GroupingSource<'_>,
    options: GroupingOptions,
) -> GroupingResult<GroupingOutput> {
    GroupDetectors::new(&FileSystemLoader).run(workspace, source, options)
}

#[cfg(test)]
mod tests {
    use super::{GroupDetectors, GroupingOptions};
    use crate::domain::{
        GroupNumberRow, GroupingErrorCategory, GroupingState, HistogramRow, SpectrumHeader,
        Workspace,
    };
    use crate::grouping::{ExplicitList, GroupingSource, InMemoryLoader};
    use crate::progress::{CallbackProgress, CancellationToken};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn workspace(rows: i32) -> Workspace {
        let x = Arc::new(vec![0.0, 1.0]);
        Workspace::histogram(
            "ws",
            (0..rows)
                .map(|index| {
                    let header = SpectrumHeader::new(Some(index), [index]);
                    HistogramRow::new(header, x.clone(), vec![1.0], vec![1.0])
                })
                .collect(),
        )
    }

    #[test]
    fn successful_runs_end_in_done_with_full_progress() {
        let seen = RefCell::new(Vec::new());
        let reporter = CallbackProgress::new(
            |fraction| seen.borrow_mut().push(fraction),
            CancellationToken::new(),
        );
        let loader = InMemoryLoader::new();
        let mut engine = GroupDetectors::new(&loader).with_progress(&reporter);

        let output = engine
            .run(
                &workspace(4),
                &GroupingSource::Explicit(ExplicitList::RowIndices(vec![0, 1])),
                GroupingOptions::default(),
            )
            .expect("grouping should succeed");

        assert_eq!(engine.state(), GroupingState::Done);
        assert_eq!(output.summary.group_count, 1);
        let seen = seen.borrow();
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{seen:?}");
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn parse_failures_end_in_failed() {
        let loader = InMemoryLoader::new().with_file("bad.map", "1\n1\n2\n0\n");
        let mut engine = GroupDetectors::new(&loader);
        let source = GroupingSource::File {
            path: PathBuf::from("bad.map"),
            exclude_group_numbers: Vec::new(),
        };

        let error = engine
            .run(&workspace(3), &source, GroupingOptions::default())
            .expect_err("declared count is not met");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert_eq!(engine.state(), GroupingState::Failed);
    }

    #[test]
    fn cancellation_ends_in_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let loader = InMemoryLoader::new().with_file("g.map", "1\n1\n1\n0\n");
        let mut engine = GroupDetectors::new(&loader).with_progress(&token);
        let source = GroupingSource::File {
            path: PathBuf::from("g.map"),
            exclude_group_numbers: Vec::new(),
        };

        let error = engine
            .run(&workspace(2), &source, GroupingOptions::default())
            .expect_err("cancelled");
        assert!(error.is_cancelled());
        assert_eq!(engine.state(), GroupingState::Cancelled);
    }

    #[test]
    fn group_number_datasets_are_rejected_up_front() {
        let template = Workspace::group_numbers(
            "template",
            vec![GroupNumberRow {
                header: SpectrumHeader::new(Some(1), [1]),
                group: 1,
            }],
        );
        let loader = InMemoryLoader::new();
        let mut engine = GroupDetectors::new(&loader);

        let error = engine
            .run(
                &template,
                &GroupingSource::Explicit(ExplicitList::RowIndices(vec![0])),
                GroupingOptions::default(),
            )
            .expect_err("type mismatch");
        assert_eq!(error.category(), GroupingErrorCategory::TypeMismatchError);
        assert_eq!(engine.state(), GroupingState::Failed);
    }
}
