//! Approximate name matching for speech-recognition noise
//!
//! A candidate is admitted when its edit distance to the spoken string is
//! at most a quarter of the candidate's length, with one edit always
//! tolerated. The admission rule only suits English-like names; short or
//! heavily abbreviated names may be matched loosely.

/// A candidate that passed the admission threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch<'c> {
    pub name: &'c str,
    pub distance: usize,
}

/// Edits tolerated for a candidate: `max(1, floor(len / 4))`
pub fn admission_threshold(candidate: &str) -> usize {
    (candidate.chars().count() / 4).max(1)
}

/// Admitted candidates ordered by ascending distance
///
/// Ties keep their input order.
pub fn rank_candidates<'c, S: AsRef<str>>(candidates: &'c [S], spoken: &str) -> Vec<NameMatch<'c>> {
    if spoken.is_empty() {
        return Vec::new();
    }

    let mut admitted: Vec<NameMatch<'c>> = candidates
        .iter()
        .map(|candidate| {
            let name = candidate.as_ref();
            NameMatch {
                name,
                distance: strsim::levenshtein(name, spoken),
            }
        })
        .filter(|m| m.distance <= admission_threshold(m.name))
        .collect();

    // sort_by_key is stable
    admitted.sort_by_key(|m| m.distance);
    admitted
}

/// Pick the candidate the user most likely meant, if any is close enough
pub fn select_best_match<'c, S: AsRef<str>>(candidates: &'c [S], spoken: &str) -> Option<&'c str> {
    let best = rank_candidates(candidates, spoken).first().map(|m| m.name);
    tracing::debug!(
        "Fuzzy match for [{}] among {} candidates: {:?}",
        spoken,
        candidates.len(),
        best
    );
    best
}
