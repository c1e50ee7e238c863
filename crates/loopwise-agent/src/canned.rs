use loopwise_core::{Completion, CompletionError, CompletionRequest, CompletionResponse};

pub const CANNED_MODEL: &str = "canned";

/// Offline completion with one fixed answer per decision type.
#[derive(Debug, Default, Clone)]
pub struct CannedCompletion {
    calls: u64,
}

impl CannedCompletion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

fn canned_answer(decision_type: &str) -> (&'static str, f64) {
    match decision_type {
        "maintenance" => (
            "Based on the operational data, I recommend scheduling preventive maintenance within 48 hours.\n\
             The maintenance team should prepare a spare bearing.\n\
             Reasoning: motor vibration levels are approaching critical thresholds.",
            0.85,
        ),
        "energy_optimization" => (
            "Energy consumption can be optimized by adjusting temperature setpoints.\n\
             We suggest implementing demand-based control strategies for the air handlers.\n\
             Reasoning: occupancy is low while the cooling load stays at daytime levels.",
            0.78,
        ),
        "fault_diagnosis" => (
            "Analysis indicates potential bearing wear.\n\
             Recommend immediate inspection and vibration analysis.\n\
             Reasoning: temperature and vibration rose together over the last readings.",
            0.92,
        ),
        _ => (
            "Standard operational recommendation based on current parameters.",
            0.7,
        ),
    }
}

impl Completion for CannedCompletion {
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self.calls += 1;
        let (content, confidence) = canned_answer(&request.decision_type);
        Ok(CompletionResponse {
            content: content.to_string(),
            confidence: Some(confidence),
            model: CANNED_MODEL.to_string(),
            tokens_used: content.split_whitespace().count() as u64,
        })
    }
}
