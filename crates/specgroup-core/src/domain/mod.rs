pub mod errors;
mod groups;
mod identifiers;
mod workspace;

pub use errors::{GroupingError, GroupingErrorCategory, GroupingResult, ParserResult};
pub use groups::{Group, GroupKey, GroupMap, RowUsage, UsedRowSet};
pub use identifiers::{IdentifierLookup, IdentifierMaps};
pub use workspace::{
    BinEdges, DetectorId, EventRow, GroupNumberRow, HistogramRow, RowKind, Rows, SpectrumHeader,
    SpectrumNumber, TofEvent, Workspace,
};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How the rows of one group are folded into a single output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behaviour {
    #[default]
    Sum,
    Average,
}

impl Behaviour {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
        }
    }
}

impl Display for Behaviour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for Behaviour {
    type Err = GroupingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "average" | "mean" => Ok(Self::Average),
            other => Err(GroupingError::configuration(
                "CONFIG.BEHAVIOUR",
                format!("unknown behaviour '{}'; expected 'sum' or 'average'", other),
            )),
        }
    }
}

/// Lifecycle of one grouping invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupingState {
    #[default]
    Idle,
    Parsing,
    Resolving,
    Combining,
    Assembling,
    Done,
    Failed,
    Cancelled,
}

impl GroupingState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Parsing => "parsing",
            Self::Resolving => "resolving",
            Self::Combining => "combining",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Parsing)
                | (Self::Parsing, Self::Resolving)
                | (Self::Resolving, Self::Combining)
                | (Self::Combining, Self::Assembling)
                | (Self::Assembling, Self::Done)
                | (Self::Parsing | Self::Resolving, Self::Failed)
                | (Self::Combining | Self::Assembling, Self::Failed)
                | (
                    Self::Parsing | Self::Resolving | Self::Combining | Self::Assembling,
                    Self::Cancelled
                )
        )
    }
}

impl Display for GroupingState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Behaviour, GroupingState};

    #[test]
    fn behaviour_parses_case_insensitively() {
        assert_eq!("Sum".parse::<Behaviour>().expect("sum"), Behaviour::Sum);
        assert_eq!(
            " AVERAGE ".parse::<Behaviour>().expect("average"),
            Behaviour::Average
        );
        assert!("median".parse::<Behaviour>().is_err());
    }

    #[test]
    fn state_machine_only_moves_forward() {
        assert!(GroupingState::Idle.can_transition_to(GroupingState::Parsing));
        assert!(GroupingState::Parsing.can_transition_to(GroupingState::Failed));
        assert!(GroupingState::Combining.can_transition_to(GroupingState::Cancelled));
        assert!(!GroupingState::Done.can_transition_to(GroupingState::Parsing));
        assert!(!GroupingState::Idle.can_transition_to(GroupingState::Combining));
        assert!(!GroupingState::Cancelled.can_transition_to(GroupingState::Done));
        assert!(GroupingState::Failed.is_terminal());
    }
}
