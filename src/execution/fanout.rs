//! Partitioned fan-out
//!
//! Turns one logical read into one wire operation per hash-range
//! partition, submits them as a single batch, and re-issues continuation
//! operations against a partition until it reports completion.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::wire::message::{OpHandle, ResultBatch, WireOperation};

/// Inclusive hash-code interval; `None` means unbounded on that side.
pub type HashRange = (Option<u16>, Option<u16>);

/// Synthesizes the partition intervals for the given partition-start
/// markers. The implicit start of the key space acts as the first
/// boundary and emits no interval by itself; each marker closes the
/// previous interval at marker minus one, and a synthetic unbounded tail
/// covers the space past the last marker. The result is non-overlapping
/// and jointly covers the whole hash space.
pub fn partition_ranges(boundaries: &[u16]) -> Result<Vec<HashRange>> {
    if !boundaries.windows(2).all(|w| w[0] < w[1]) || boundaries.first() == Some(&0) {
        return Err(Error::InvalidArgument(
            "partition boundaries must be ascending and non-zero".into(),
        ));
    }
    let mut ranges = Vec::with_capacity(boundaries.len() + 1);
    let mut lower: Option<u16> = None;
    for &boundary in boundaries {
        ranges.push((lower, Some(boundary - 1)));
        lower = Some(boundary);
    }
    ranges.push((lower, None));
    Ok(ranges)
}

/// Drives the wire operations of one read statement. Operations for every
/// partition are applied before a single flush; afterwards each outcome is
/// inspected individually, since a batch-level success does not guarantee
/// every operation succeeded.
pub struct FanOutExecutor<S: Session> {
    session: Arc<S>,
    /// Read template the continuation operations are rebuilt from.
    template: WireOperation,
    /// Flushed operations not yet drained, front-to-back.
    pending: VecDeque<(HashRange, OpHandle)>,
}

impl<S: Session> FanOutExecutor<S> {
    /// Builds, applies, and flushes the read batch. A read pinned to a row
    /// key goes to the owning partition as a single operation; anything
    /// else fans out across every partition interval.
    pub fn execute_read(
        session: Arc<S>,
        template: WireOperation,
        boundaries: &[u16],
    ) -> Result<Self> {
        let mut pending = VecDeque::new();
        if template.row_key.is_some() {
            let handle = session.apply(template.clone());
            pending.push_back(((None, None), handle));
        } else {
            for range in partition_ranges(boundaries)? {
                let mut op = template.clone();
                op.hash_range_lower = range.0;
                op.hash_range_upper = range.1;
                pending.push_back((range, session.apply(op)));
            }
        }
        debug!(ops = pending.len(), table = %template.table, "flushing read batch");
        session.flush()?;
        Ok(FanOutExecutor {
            session,
            template,
            pending,
        })
    }

    /// True once every partition has been drained to completion.
    pub fn end_of_result(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes the next completed batch, re-issuing a continuation operation
    /// against the same partition when the batch indicates truncation.
    /// Store-reported conflict statuses surface verbatim.
    pub fn next_batch(&mut self) -> Result<Option<ResultBatch>> {
        let Some((range, handle)) = self.pending.pop_front() else {
            return Ok(None);
        };
        let outcome = self.session.take_outcome(handle)?;
        let batch = outcome
            .into_result()?
            .ok_or_else(|| Error::Internal("read operation completed without a batch".into()))?;

        if let Some(token) = batch.continuation.clone() {
            let mut op = self.template.clone();
            op.hash_range_lower = range.0;
            op.hash_range_upper = range.1;
            op.continuation = Some(token);
            let handle = self.session.apply(op);
            self.session.flush()?;
            debug!(lower = ?range.0, upper = ?range.1, "re-issued continuation");
            // Front of the queue: drain this partition fully before moving
            // to its siblings.
            self.pending.push_front((range, handle));
        }
        Ok(Some(batch))
    }
}

/// Submits a single write operation and returns its affected-row count.
/// Writes address one explicit key, so there is no fan-out.
pub fn execute_write<S: Session>(session: &S, op: WireOperation) -> Result<u64> {
    let handle = session.apply(op);
    session.flush()?;
    let outcome = session.take_outcome(handle)?;
    let rows_affected = outcome.rows_affected;
    outcome.into_result()?;
    Ok(rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers_single_unbounded_partition() {
        assert_eq!(partition_ranges(&[]).unwrap(), vec![(None, None)]);
    }

    #[test]
    fn test_single_marker_splits_space_in_two() {
        let ranges = partition_ranges(&[0x8000]).unwrap();
        assert_eq!(ranges, vec![(None, Some(0x7FFF)), (Some(0x8000), None)]);
    }

    #[test]
    fn test_ranges_are_contiguous_and_covering() {
        let markers = [10, 500, 501, 0x9000, 0xFFFF];
        let ranges = partition_ranges(&markers).unwrap();
        assert_eq!(ranges.len(), markers.len() + 1);
        assert_eq!(ranges.first().unwrap().0, None);
        assert_eq!(ranges.last().unwrap().1, None);
        for pair in ranges.windows(2) {
            let upper = pair[0].1.unwrap();
            let next_lower = pair[1].0.unwrap();
            // Upper bound of partition i is the lower bound of i+1 minus
            // one unit: no gaps, no overlap.
            assert_eq!(upper + 1, next_lower);
        }
    }

    #[test]
    fn test_rejects_unsorted_or_zero_markers() {
        assert!(partition_ranges(&[5, 5]).is_err());
        assert!(partition_ranges(&[9, 2]).is_err());
        assert!(partition_ranges(&[0]).is_err());
    }
}
