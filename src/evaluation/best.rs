//! Picks the conversation with the highest score.

use crate::error::{Result, SimError};

/// Return the element of `results` at the index of the maximum of
/// `scores`. The first maximum wins on ties.
///
/// `results` and `scores` are parallel arrays and must have the same length.
pub fn pick_best<'a, T, S>(results: &'a [T], scores: &[S]) -> Result<&'a T>
where
    S: PartialOrd,
{
    if results.len() != scores.len() {
        return Err(SimError::Alignment {
            results: results.len(),
            scores: scores.len(),
        });
    }
    if results.is_empty() {
        return Err(SimError::empty_input("no conversations to pick from"));
    }

    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }
    Ok(&results[best])
}
