//! Derivations from a completion's text: reasoning, recommendations and the
//! static next-action table.

/// Case-insensitive marker that introduces an explicit reasoning section.
const REASONING_MARKER: &str = "reasoning:";
/// Number of leading sentences used when no marker is present.
const REASONING_SENTENCES: usize = 2;

const RECOMMENDATION_KEYWORDS: [&str; 4] = ["recommend", "suggest", "should", "action"];
const MAX_RECOMMENDATIONS: usize = 3;
const GENERIC_RECOMMENDATIONS: [&str; 3] = [
    "Monitor system parameters closely",
    "Review operational procedures",
    "Schedule follow-up assessment",
];

pub(crate) const FALLBACK_DECISION: &str = "Unable to make decision due to system error";
pub(crate) const FALLBACK_RECOMMENDATIONS: [&str; 2] =
    ["Check system connectivity", "Verify data quality"];

const MAINTENANCE_ACTIONS: [&str; 4] = [
    "Schedule maintenance activities",
    "Prepare replacement parts",
    "Notify maintenance team",
    "Update maintenance schedule",
];
const ENERGY_OPTIMIZATION_ACTIONS: [&str; 4] = [
    "Implement energy-saving measures",
    "Adjust operational parameters",
    "Monitor energy consumption",
    "Track cost savings",
];
const FAULT_DIAGNOSIS_ACTIONS: [&str; 4] = [
    "Investigate identified issues",
    "Implement corrective measures",
    "Monitor system recovery",
    "Document incident details",
];
const GENERIC_ACTIONS: [&str; 3] = [
    "Review decision outcomes",
    "Monitor system performance",
    "Update operational procedures",
];

/// Text after the first `reasoning:` marker up to the next `.`, trimmed;
/// otherwise the first two non-empty sentences joined with `". "`.
#[must_use]
pub fn extract_reasoning(content: &str) -> String {
    // ASCII lowering keeps byte offsets identical to `content`.
    let lowered = content.to_ascii_lowercase();
    if let Some(pos) = lowered.find(REASONING_MARKER) {
        let rest = &content[pos + REASONING_MARKER.len()..];
        let end = rest.find('.').unwrap_or(rest.len());
        return rest[..end].trim().to_string();
    }

    content
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(REASONING_SENTENCES)
        .collect::<Vec<_>>()
        .join(". ")
}

/// Up to three non-heading lines mentioning a recommendation keyword, or the
/// generic list when none match.
#[must_use]
pub fn extract_recommendations(content: &str) -> Vec<String> {
    let found: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let lower = line.to_lowercase();
            RECOMMENDATION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .take(MAX_RECOMMENDATIONS)
        .map(ToString::to_string)
        .collect();

    if found.is_empty() {
        GENERIC_RECOMMENDATIONS
            .iter()
            .map(ToString::to_string)
            .collect()
    } else {
        found
    }
}

/// Fixed follow-up actions per decision type.
#[must_use]
pub fn next_actions(decision_type: &str) -> Vec<String> {
    let actions: &[&str] = match decision_type {
        "maintenance" => &MAINTENANCE_ACTIONS,
        "energy_optimization" => &ENERGY_OPTIMIZATION_ACTIONS,
        "fault_diagnosis" => &FAULT_DIAGNOSIS_ACTIONS,
        _ => &GENERIC_ACTIONS,
    };
    actions.iter().map(ToString::to_string).collect()
}
