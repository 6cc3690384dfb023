//! Keyword-based profile inference from free-text messages.
//!
//! Matching is case-insensitive substring containment against the fixed
//! vocabularies in [`SkinType::ALL`] and [`Concern::ALL`], scanned in order.
//! Skin type is set once and never overwritten; concerns only grow.

use crate::model::{Concern, SkinType, UserProfile};
use crate::selection::Selection;

/// First skin type mentioned in `text`, in vocabulary order.
pub fn detect_skin_type(text: &str) -> Option<SkinType> {
    let lower = text.to_lowercase();
    SkinType::ALL
        .into_iter()
        .find(|t| lower.contains(t.keyword()))
}

/// Every concern mentioned in `text`, in vocabulary order.
pub fn detect_concerns(text: &str) -> Vec<Concern> {
    let lower = text.to_lowercase();
    Concern::ALL
        .into_iter()
        .filter(|c| lower.contains(c.keyword()))
        .collect()
}

/// Fold what `message` reveals into `profile` and refresh its product projection.
pub fn extract(profile: &UserProfile, message: &str, selection: &Selection) -> UserProfile {
    let mut next = profile.clone();

    if next.skin_type.is_none() {
        next.skin_type = detect_skin_type(message);
    }

    for concern in detect_concerns(message) {
        if !next.concerns.contains(&concern) {
            next.concerns.push(concern);
        }
    }

    next.selected_products = selection.summaries();
    next
}
