//! Name similarity used to rank near-miss suggestions.
//!
//! Names are compared on their camelCase segments first and on characters
//! second. A candidate that shares a whole segment with the request, or
//! whose lowercase name contains the other as a substantial part, is
//! *segment-related* and always scores at least 0.5. An unrelated name
//! scores below 0.5 and only clears the default threshold when it is within
//! a typo of the request. Pieces shorter than three characters never make
//! two names related.

use cdr_dictionary::naming::split_segments;
use std::collections::HashSet;

/// Default minimum score for a suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.4;

/// Default number of suggestions surfaced to the approver.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

const SEGMENT_WEIGHT: f64 = 0.7;
const EDIT_WEIGHT: f64 = 0.3;

/// Shortest shared segment or contained name that relates two names.
const MIN_RELATED_LEN: usize = 3;

/// Similarity of `candidate` to `requested`, in `[0.0, 1.0]`.
pub fn similarity(requested: &str, candidate: &str) -> f64 {
    let requested_lower = requested.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    let edit = strsim::normalized_damerau_levenshtein(&requested_lower, &candidate_lower);

    let requested_segments = segment_set(requested);
    let candidate_segments = segment_set(candidate);

    if is_related(
        &requested_lower,
        &candidate_lower,
        &requested_segments,
        &candidate_segments,
    ) {
        let overlap = jaccard(&requested_segments, &candidate_segments);
        0.5 + 0.5 * (SEGMENT_WEIGHT * overlap + EDIT_WEIGHT * edit)
    } else {
        0.5 * edit
    }
}

/// True when the names share a segment or one contains the other.
///
/// A contained name must be at least half as long as the containing one.
pub fn is_segment_related(requested: &str, candidate: &str) -> bool {
    is_related(
        &requested.to_lowercase(),
        &candidate.to_lowercase(),
        &segment_set(requested),
        &segment_set(candidate),
    )
}

fn is_related(a: &str, b: &str, a_segments: &HashSet<String>, b_segments: &HashSet<String>) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let shares_segment = a_segments
        .intersection(b_segments)
        .any(|segment| segment.chars().count() >= MIN_RELATED_LEN);
    shares_segment || contains_substantial(a, b) || contains_substantial(b, a)
}

/// `outer` contains `inner`, and `inner` is long enough to mean something.
fn contains_substantial(outer: &str, inner: &str) -> bool {
    let inner_len = inner.chars().count();
    inner_len >= MIN_RELATED_LEN
        && inner_len * 2 >= outer.chars().count()
        && outer.contains(inner)
}

fn segment_set(name: &str) -> HashSet<String> {
    split_segments(name).into_iter().collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_one() {
        assert!((similarity("emailAddress", "emailAddress") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn shared_segment_outranks_character_overlap() {
        let sms = similarity("mobileNumber", "smsNumber");
        let unrelated = similarity("mobileNumber", "mobilityBand");
        assert!(is_segment_related("mobileNumber", "smsNumber"));
        assert!(!is_segment_related("mobileNumber", "mobilityBand"));
        assert!(sms >= 0.5);
        assert!(unrelated < 0.5);
        assert!(sms > unrelated);
    }

    #[test]
    fn substring_counts_as_related() {
        assert!(is_segment_related("email", "emailAddress"));
        assert!(similarity("email", "emailAddress") >= 0.5);
    }

    #[test]
    fn short_fragments_are_not_related() {
        for fragment in ["e", "n", "nm", "id"] {
            for candidate in ["emailAddress", "smsNumber", "homePhoneNumber", "preferredChannel"] {
                assert!(!is_segment_related(fragment, candidate), "{fragment} vs {candidate}");
                assert!(similarity(fragment, candidate) < SUGGESTION_THRESHOLD);
            }
        }
        // A short fragment buried in a long name is not enough either.
        assert!(!is_segment_related("pho", "homePhoneNumber"));
        assert!(is_segment_related("mail", "email"));
    }

    #[test]
    fn unrelated_names_stay_below_threshold() {
        assert!(similarity("mobileNumber", "createdAt") < SUGGESTION_THRESHOLD);
        assert!(similarity("mobileNumber", "firstName") < SUGGESTION_THRESHOLD);
    }

    #[test]
    fn typos_clear_threshold() {
        // No shared segment, one missing letter.
        assert!(!is_segment_related("adress", "address"));
        assert!(similarity("adress", "address") >= SUGGESTION_THRESHOLD);
    }

    #[test]
    fn more_shared_segments_rank_higher() {
        let two = similarity("homePhoneNumber", "workPhoneNumber");
        let one = similarity("homePhoneNumber", "smsNumber");
        assert!(two > one);
    }
}
