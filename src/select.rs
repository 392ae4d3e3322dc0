//! Result selection: rank candidate answers by score.

use crate::error::{ExtractError, ExtractResult};
use crate::trapi::{Message, TrapiResult};

/// Indices into `message.results`, ordered by primary-analysis score, highest first.
///
/// The sort is stable, so equal scores keep the service's order. Fails if there
/// are no results or any result lacks a scored analysis.
pub fn ranked_indices(message: &Message) -> ExtractResult<Vec<usize>> {
    if message.results.is_empty() {
        return Err(ExtractError::malformed("response contains no results"));
    }

    let mut scored = message
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| r.score().map(|s| (s, i)))
        .collect::<ExtractResult<Vec<_>>>()?;

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(scored.into_iter().map(|(_, i)| i).collect())
}

/// The message's results in [`ranked_indices`] order.
pub fn ranked_results(message: &Message) -> ExtractResult<Vec<&TrapiResult>> {
    Ok(ranked_indices(message)?
        .into_iter()
        .map(|i| &message.results[i])
        .collect())
}

/// Pick the result at rank `idx` (0 is the best-scored answer).
pub fn select(message: &Message, idx: usize) -> ExtractResult<&TrapiResult> {
    let ranked = ranked_results(message)?;
    let len = ranked.len();
    ranked
        .into_iter()
        .nth(idx)
        .ok_or(ExtractError::IndexOutOfRange { index: idx, len })
}
