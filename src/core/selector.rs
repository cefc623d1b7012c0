use crate::domain::model::CandidateRecord;

/// Picks the record to enrich: the first `ACTIVA` candidate, otherwise the
/// first candidate in registry order. `None` only for an empty slice.
pub fn select_candidate(candidates: &[CandidateRecord]) -> Option<&CandidateRecord> {
    candidates
        .iter()
        .find(|c| c.is_active())
        .or_else(|| candidates.first())
}
