use crate::domain::model::{CandidateRecord, EnrichmentRecord, ResultRow};

/// First non-empty value in precedence order, or an empty string.
fn prefer(values: &[Option<&String>]) -> String {
    values
        .iter()
        .flatten()
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// `"<code> - <description>"` when a description exists, the code alone otherwise.
pub fn compose_activity(code: &str, description: Option<&str>) -> String {
    match description {
        Some(desc) if !desc.is_empty() => format!("{} - {}", code, desc),
        _ => code.to_string(),
    }
}

/// Builds the result row for `identifier`. Each field independently prefers
/// the enrichment value, then the candidate value.
pub fn merge_records(
    identifier: &str,
    candidate: &CandidateRecord,
    enrichment: Option<&EnrichmentRecord>,
) -> ResultRow {
    let from_detail = |f: fn(&EnrichmentRecord) -> Option<&String>| enrichment.and_then(f);

    let activity_code = prefer(&[
        from_detail(|e| e.activity_code.as_ref()),
        candidate.activity_code.as_ref(),
    ]);
    let activity_description = from_detail(|e| e.activity_description.as_ref());

    ResultRow {
        identifier: identifier.to_string(),
        company_name: prefer(&[
            from_detail(|e| e.legal_name.as_ref()),
            candidate.legal_name.as_ref(),
        ]),
        category: prefer(&[
            from_detail(|e| e.category.as_ref()),
            candidate.category.as_ref(),
        ]),
        chamber: prefer(&[
            from_detail(|e| e.chamber_name.as_ref()),
            candidate.chamber_name.as_ref(),
        ]),
        status: prefer(&[from_detail(|e| e.status.as_ref()), candidate.status.as_ref()]),
        last_renewal_year: prefer(&[
            from_detail(|e| e.last_renewal_year.as_ref()),
            candidate.last_renewal_year.as_ref(),
        ]),
        activity: compose_activity(&activity_code, activity_description.map(String::as_str)),
        error: None,
    }
}
