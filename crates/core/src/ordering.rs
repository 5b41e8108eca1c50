//! Gallery ordering rules.
//!
//! Positions are unique per gallery and dense but not required to be
//! contiguous; a reorder always rewrites them as `0..n`.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::types::DbId;

/// Position assigned to the first image of an empty gallery.
pub const FIRST_POSITION: i32 = 0;

/// Position for an image appended after `current_max`.
pub fn next_position(current_max: Option<i32>) -> i32 {
    current_max.map_or(FIRST_POSITION, |max| max + 1)
}

/// Validate that `requested` is a permutation of `current`.
///
/// Rejects duplicates, ids that are not active in the gallery, and orders
/// that leave out an active image.
pub fn validate_reorder(current: &[DbId], requested: &[DbId]) -> Result<(), CoreError> {
    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(CoreError::Validation(format!(
                "Image {id} appears more than once in the requested order"
            )));
        }
    }

    let known: HashSet<DbId> = current.iter().copied().collect();
    if let Some(unknown) = requested.iter().find(|id| !known.contains(id)) {
        return Err(CoreError::Validation(format!(
            "Image {unknown} is not an active image of this gallery"
        )));
    }
    if requested.len() != known.len() {
        return Err(CoreError::Validation(format!(
            "Requested order has {} images; the gallery has {}",
            requested.len(),
            known.len()
        )));
    }
    Ok(())
}

/// Pair each id with its new dense position.
pub fn positions_for(order: &[DbId]) -> Vec<(DbId, i32)> {
    order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32))
        .collect()
}
