//! Segmentation of transition logs.
use crate::error::MimicError;
use anyhow::Result;
use rand::Rng;
use std::collections::BTreeSet;

/// Splits a log into episode-aligned half-open ranges `[start, end)`.
///
/// Every index `i` flagged as terminal or timeout closes a segment at `i + 1`.
/// `0` and the log length are always boundaries, so the segments partition
/// `[0, len)` without gaps or overlaps. An empty log has no segment.
pub fn split_into_trajectories(terminals: &[bool], timeouts: &[bool]) -> Vec<(usize, usize)> {
    debug_assert_eq!(terminals.len(), timeouts.len());
    let max_step = terminals.len();

    let mut boundaries = BTreeSet::from([0, max_step]);
    boundaries.extend(
        terminals
            .iter()
            .zip(timeouts.iter())
            .enumerate()
            .filter(|(_, (&terminal, &timeout))| terminal || timeout)
            .map(|(i, _)| i + 1),
    );

    let boundaries = boundaries.into_iter().collect::<Vec<_>>();
    boundaries.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Samples `n` segments without replacement, keeping their order in the log.
///
/// Fails with [`MimicError::InsufficientTrajectories`] if `n` exceeds the
/// number of segments.
pub fn sample_trajectories<R: Rng + ?Sized>(
    segments: &[(usize, usize)],
    n: usize,
    rng: &mut R,
) -> Result<Vec<(usize, usize)>> {
    if n > segments.len() {
        return Err(MimicError::InsufficientTrajectories {
            requested: n,
            available: segments.len(),
        }
        .into());
    }

    let mut ixs = rand::seq::index::sample(rng, segments.len(), n).into_vec();
    ixs.sort_unstable();
    Ok(ixs.into_iter().map(|ix| segments[ix]).collect())
}
