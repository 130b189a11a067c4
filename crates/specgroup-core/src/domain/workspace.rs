use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type DetectorId = i32;
pub type SpectrumNumber = i32;

/// Bin boundaries shared between rows that were binned identically.
pub type BinEdges = Arc<Vec<f64>>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumHeader {
    #[serde(default)]
    pub spectrum_number: Option<SpectrumNumber>,
    #[serde(default)]
    pub detector_ids: BTreeSet<DetectorId>,
    /// Set when every detector behind this row is masked.
    #[serde(default)]
    pub masked: bool,
}

impl SpectrumHeader {
    pub fn new(
        spectrum_number: Option<SpectrumNumber>,
        detector_ids: impl IntoIterator<Item = DetectorId>,
    ) -> Self {
        Self {
            spectrum_number,
            detector_ids: detector_ids.into_iter().collect(),
            masked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramRow {
    #[serde(flatten)]
    pub header: SpectrumHeader,
    pub x: BinEdges,
    pub y: Vec<f64>,
    pub e: Vec<f64>,
    #[serde(default)]
    pub masked_bins: BTreeSet<usize>,
}

impl HistogramRow {
    pub fn new(header: SpectrumHeader, x: BinEdges, y: Vec<f64>, e: Vec<f64>) -> Self {
        Self {
            header,
            x,
            y,
            e,
            masked_bins: BTreeSet::new(),
        }
    }

    pub fn with_masked_bins(mut self, bins: impl IntoIterator<Item = usize>) -> Self {
        self.masked_bins.extend(bins);
        self
    }

    pub fn bin_count(&self) -> usize {
        self.y.len()
    }

    pub fn is_bin_masked(&self, bin: usize) -> bool {
        self.masked_bins.contains(&bin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TofEvent {
    pub tof: f64,
    #[serde(default)]
    pub pulse_time: i64,
    #[serde(default = "unit_weight")]
    pub weight: f64,
    #[serde(default = "unit_weight")]
    pub error_squared: f64,
}

fn unit_weight() -> f64 {
    1.0
}

impl TofEvent {
    pub fn new(tof: f64, pulse_time: i64) -> Self {
        Self {
            tof,
            pulse_time,
            weight: 1.0,
            error_squared: 1.0,
        }
    }

    pub fn weighted(tof: f64, pulse_time: i64, weight: f64, error_squared: f64) -> Self {
        Self {
            tof,
            pulse_time,
            weight,
            error_squared,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    #[serde(flatten)]
    pub header: SpectrumHeader,
    pub x: BinEdges,
    #[serde(default)]
    pub events: Vec<TofEvent>,
}

impl EventRow {
    pub fn new(header: SpectrumHeader, x: BinEdges, events: Vec<TofEvent>) -> Self {
        Self { header, x, events }
    }

    pub fn total_weight(&self) -> f64 {
        self.events.iter().map(|event| event.weight).sum()
    }

    pub fn scale_weights(&mut self, factor: f64) {
        let factor_squared = factor * factor;
        for event in &mut self.events {
            event.weight *= factor;
            event.error_squared *= factor_squared;
        }
    }
}

/// One row of a grouping template: the group number its detectors belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNumberRow {
    #[serde(flatten)]
    pub header: SpectrumHeader,
    /// Zero means the detectors are not grouped.
    pub group: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rows {
    Histogram(Vec<HistogramRow>),
    Event(Vec<EventRow>),
    GroupNumbers(Vec<GroupNumberRow>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Histogram,
    Event,
    GroupNumbers,
}

impl RowKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Histogram => "histogram",
            Self::Event => "event",
            Self::GroupNumbers => "group-numbers",
        }
    }
}

impl Display for RowKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub name: String,
    pub rows: Rows,
}

impl Workspace {
    pub fn histogram(name: impl Into<String>, rows: Vec<HistogramRow>) -> Self {
        Self {
            name: name.into(),
            rows: Rows::Histogram(rows),
        }
    }

    pub fn event(name: impl Into<String>, rows: Vec<EventRow>) -> Self {
        Self {
            name: name.into(),
            rows: Rows::Event(rows),
        }
    }

    pub fn group_numbers(name: impl Into<String>, rows: Vec<GroupNumberRow>) -> Self {
        Self {
            name: name.into(),
            rows: Rows::GroupNumbers(rows),
        }
    }

    pub fn kind(&self) -> RowKind {
        match &self.rows {
            Rows::Histogram(_) => RowKind::Histogram,
            Rows::Event(_) => RowKind::Event,
            Rows::GroupNumbers(_) => RowKind::GroupNumbers,
        }
    }

    pub fn row_count(&self) -> usize {
        match &self.rows {
            Rows::Histogram(rows) => rows.len(),
            Rows::Event(rows) => rows.len(),
            Rows::GroupNumbers(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn header(&self, index: usize) -> Option<&SpectrumHeader> {
        match &self.rows {
            Rows::Histogram(rows) => rows.get(index).map(|row| &row.header),
            Rows::Event(rows) => rows.get(index).map(|row| &row.header),
            Rows::GroupNumbers(rows) => rows.get(index).map(|row| &row.header),
        }
    }

    pub fn headers(&self) -> Vec<&SpectrumHeader> {
        (0..self.row_count())
            .filter_map(|index| self.header(index))
            .collect()
    }

    pub fn spectrum_number(&self, index: usize) -> Option<SpectrumNumber> {
        self.header(index).and_then(|header| header.spectrum_number)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventRow, HistogramRow, RowKind, SpectrumHeader, TofEvent, Workspace};
    use std::sync::Arc;

    #[test]
    fn workspace_reports_kind_and_headers() {
        let x = Arc::new(vec![0.0, 1.0, 2.0]);
        let workspace = Workspace::histogram(
            "bank",
            vec![
                HistogramRow::new(
                    SpectrumHeader::new(Some(7), [70, 71]),
                    x.clone(),
                    vec![1.0, 2.0],
                    vec![1.0, 1.0],
                ),
                HistogramRow::new(SpectrumHeader::new(None, [72]), x, vec![0.0; 2], vec![0.0; 2]),
            ],
        );

        assert_eq!(workspace.kind(), RowKind::Histogram);
        assert_eq!(workspace.row_count(), 2);
        assert_eq!(workspace.spectrum_number(0), Some(7));
        assert_eq!(workspace.spectrum_number(1), None);
        assert_eq!(workspace.spectrum_number(2), None);
        assert_eq!(workspace.headers().len(), 2);
    }

    #[test]
    fn scaling_event_weights_scales_errors_quadratically() {
        let mut row = EventRow::new(
            SpectrumHeader::new(Some(1), [1]),
            Arc::new(vec![0.0, 10.0]),
            vec![TofEvent::new(1.0, 0), TofEvent::weighted(2.0, 5, 2.0, 4.0)],
        );
        row.scale_weights(0.5);

        assert!((row.total_weight() - 1.5).abs() < 1.0e-12);
        assert!((row.events[0].error_squared - 0.25).abs() < 1.0e-12);
        assert!((row.events[1].error_squared - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn workspace_json_uses_tagged_row_kinds() {
        let workspace = Workspace::histogram(
            "tiny",
            vec![
                HistogramRow::new(
                    SpectrumHeader::new(Some(1), [10]),
                    Arc::new(vec![0.0, 1.0]),
                    vec![3.0],
                    vec![1.5],
                )
                .with_masked_bins([0]),
            ],
        );

        let json = serde_json::to_value(&workspace).expect("workspace should serialize");
        assert_eq!(json["rows"]["histogram"][0]["spectrumNumber"], 1);
        assert_eq!(json["rows"]["histogram"][0]["maskedBins"][0], 0);

        let restored: Workspace = serde_json::from_value(json).expect("workspace should parse");
        assert_eq!(restored, workspace);
    }
}
