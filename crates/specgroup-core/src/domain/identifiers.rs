use super::{DetectorId, SpectrumNumber, Workspace};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::warn;

/// Read-only translation of external identifiers into row indices of one
/// dataset. A partitioned dataset can provide its own implementation.
pub trait IdentifierLookup {
    fn row_for_detector(&self, detector_id: DetectorId) -> Option<usize>;
    fn row_for_spectrum(&self, spectrum_number: SpectrumNumber) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifierMaps {
    detector_to_row: HashMap<DetectorId, usize>,
    spectrum_to_row: HashMap<SpectrumNumber, usize>,
}

impl IdentifierMaps {
    /// When two rows claim the same identifier the lower row index wins.
    pub fn from_workspace(workspace: &Workspace) -> Self {
        let mut maps = Self::default();
        for (index, header) in workspace.headers().into_iter().enumerate() {
            for &detector_id in &header.detector_ids {
                if let Entry::Vacant(slot) = maps.detector_to_row.entry(detector_id) {
                    slot.insert(index);
                } else {
                    warn!(
                        detector_id,
                        row = index,
                        "detector is already assigned to an earlier row; keeping the first"
                    );
                }
            }

            if let Some(spectrum_number) = header.spectrum_number {
                if let Entry::Vacant(slot) = maps.spectrum_to_row.entry(spectrum_number) {
                    slot.insert(index);
                } else {
                    warn!(
                        spectrum_number,
                        row = index,
                        "spectrum number is already used by an earlier row; keeping the first"
                    );
                }
            }
        }
        maps
    }

    pub fn detector_count(&self) -> usize {
        self.detector_to_row.len()
    }

    pub fn spectrum_count(&self) -> usize {
        self.spectrum_to_row.len()
    }
}

impl IdentifierLookup for IdentifierMaps {
    fn row_for_detector(&self, detector_id: DetectorId) -> Option<usize> {
        self.detector_to_row.get(&detector_id).copied()
    }

    fn row_for_spectrum(&self, spectrum_number: SpectrumNumber) -> Option<usize> {
        self.spectrum_to_row.get(&spectrum_number).copied()
    }
}
