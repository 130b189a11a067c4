use crate::domain::{Behaviour, GroupingError, GroupingResult, HistogramRow, SpectrumHeader};
use std::collections::BTreeSet;

/// Folds the rows of one group into a single histogram row.
///
/// Each bin keeps its own count of contributing rows: a row adds to bin `b`
/// only when the row is not masked and `b` is not among its masked bins.
/// The error is the quadrature sum, divided by the count under
/// [`Behaviour::Average`]. A bin nobody contributes to comes out as zero.
///
/// Bin edges are taken from the first row; callers guarantee that all rows
/// share the same binning. Summing a group of one row copies it unchanged;
/// averaging one row still applies the masks.
pub fn combine_histograms(
    rows: &[&HistogramRow],
    behaviour: Behaviour,
) -> GroupingResult<HistogramRow> {
    let Some(first) = rows.first() else {
        return Err(empty_group());
    };
    if rows.len() == 1 && behaviour == Behaviour::Sum {
        return Ok((*first).clone());
    }

    let bin_count = first.bin_count();
    let mut sum = vec![0.0; bin_count];
    let mut squared_error = vec![0.0; bin_count];
    let mut count = vec![0_usize; bin_count];

    for row in rows.iter().filter(|row| !row.header.masked) {
        for bin in 0..bin_count {
            if row.is_bin_masked(bin) {
                continue;
            }
            let (Some(y), Some(e)) = (row.y.get(bin), row.e.get(bin)) else {
                continue;
            };
            sum[bin] += y;
            squared_error[bin] += e * e;
            count[bin] += 1;
        }
    }

    let mut e: Vec<f64> = squared_error.into_iter().map(f64::sqrt).collect();
    if behaviour == Behaviour::Average {
        for bin in 0..bin_count {
            if count[bin] > 0 {
                let contributors = count[bin] as f64;
                sum[bin] /= contributors;
                e[bin] /= contributors;
            } else {
                sum[bin] = 0.0;
                e[bin] = 0.0;
            }
        }
    }

    Ok(HistogramRow::new(
        combined_header(rows.iter().map(|row| &row.header)),
        first.x.clone(),
        sum,
        e,
    ))
}

/// Union of the contributing detectors. The output is masked only when every
/// contributing row was.
pub(crate) fn combined_header<'a>(
    headers: impl Iterator<Item = &'a SpectrumHeader>,
) -> SpectrumHeader {
    let mut detector_ids = BTreeSet::new();
    let mut all_masked = true;
    for header in headers {
        detector_ids.extend(header.detector_ids.iter().copied());
        all_masked &= header.masked;
    }
    SpectrumHeader {
        spectrum_number: None,
        detector_ids,
        masked: all_masked,
    }
}

pub(crate) fn empty_group() -> GroupingError {
    GroupingError::configuration("CONFIG.EMPTY_GROUP", "cannot combine a group without rows")
}
