//! Prompt templates for the text-completion collaborator.

use loopwise_core::{CompletionRequest, DataMap};
use serde_json::Value;

struct Template {
    focus: &'static str,
    task: &'static str,
}

fn template(decision_type: &str) -> Template {
    match decision_type {
        "maintenance" => Template {
            focus: "predictive maintenance",
            task: "Assess equipment condition and decide whether maintenance is needed and how urgently.",
        },
        "energy_optimization" => Template {
            focus: "energy efficiency",
            task: "Identify measures that reduce energy consumption and cost without hurting comfort or uptime.",
        },
        "fault_diagnosis" => Template {
            focus: "fault diagnostics",
            task: "Diagnose the most likely fault and the checks that would confirm it.",
        },
        _ => Template {
            focus: "building operations",
            task: "Decide on the most useful operational response to the current state.",
        },
    }
}

fn write_section(prompt: &mut String, title: &str, data: &DataMap) {
    prompt.push_str(&format!("{title}:\n"));
    if data.is_empty() {
        prompt.push_str("- (none)\n");
    }
    for (key, value) in data {
        let line = match value {
            Value::String(s) => format!("- {key}: {s}\n"),
            other => format!("- {key}: {other}\n"),
        };
        prompt.push_str(&line);
    }
    prompt.push('\n');
}

/// Render the prompt for one decision request.
#[must_use]
pub fn render_prompt(request: &CompletionRequest) -> String {
    let template = template(&request.decision_type);
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are an AI assistant for {} in commercial buildings.\n",
        template.focus
    ));
    prompt.push_str(&format!("Decision type: {}\n\n", request.decision_type));
    write_section(&mut prompt, "Operational data", &request.operational_data);
    if let Some(context) = &request.context {
        write_section(&mut prompt, "Context", context);
    }
    prompt.push_str(template.task);
    prompt.push('\n');
    prompt.push_str(
        "List each recommendation on its own line and finish with a line starting with \"Reasoning:\".\n",
    );

    prompt
}
