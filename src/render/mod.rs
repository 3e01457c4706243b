// Result rendering
//
// Pure functions from the typed result model to HTML fragments. Input is
// never mutated and all free text is escaped before it is embedded, so
// engine output cannot inject markup into the page.

use std::collections::BTreeMap;

use crate::models::{DebateRound, Decision, Persona, ThinkingOutput, VoteOutput};

pub mod page;

const NO_OUTPUT: &str = "No output produced.";
const NO_RESPONSE: &str = "No response produced.";
const NO_RESPONSES: &str = "No responses generated.";
const NO_VOTE: &str = "No vote recorded.";

/// Escape text for embedding in HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One labeled persona card.
pub fn render_persona_block(label: &str, css_class: &str, content: &str) -> String {
    format!(
        "<div class='persona-card {css_class}'>\
         <div class='persona-title'>{label}</div>\
         <pre class='persona-content'>{}</pre>\
         </div>",
        escape_html(content)
    )
}

/// Thinking phase: one card per persona in canonical order.
pub fn render_thinking(thinking: &BTreeMap<Persona, ThinkingOutput>) -> String {
    let mut out = String::from("<div class='persona-columns'>");
    for persona in Persona::ALL {
        let content = thinking
            .get(&persona)
            .map(|output| output.content.as_str())
            .unwrap_or(NO_OUTPUT);
        out.push_str(&render_persona_block(
            persona.label(),
            persona.css_class(),
            content,
        ));
    }
    out.push_str("</div>");
    out
}

/// One debate round: one card per persona in canonical order, each listing
/// its directed responses in the response map's order.
pub fn render_debate_round(round: &DebateRound) -> String {
    let mut out = String::new();
    for persona in Persona::ALL {
        let content = match round.outputs.get(&persona) {
            None => NO_RESPONSE.to_string(),
            Some(output) => {
                let responses: Vec<String> = output
                    .responses
                    .iter()
                    .map(|(target, response)| format!("To {}: {}", target.label(), response))
                    .collect();
                if responses.is_empty() {
                    NO_RESPONSES.to_string()
                } else {
                    responses.join("\n\n")
                }
            }
        };
        out.push_str(&render_persona_block(
            persona.label(),
            persona.css_class(),
            &content,
        ));
    }
    out
}

/// One row of the voting table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRow {
    pub persona: &'static str,
    pub vote: String,
    pub reason: String,
    pub conditions: String,
}

/// Voting rows in canonical persona order. Missing votes become "N/A"
/// rows; conditions join with " | " for the screen.
pub fn voting_rows(voting: &BTreeMap<Persona, VoteOutput>) -> Vec<VoteRow> {
    Persona::ALL
        .into_iter()
        .map(|persona| match voting.get(&persona) {
            None => VoteRow {
                persona: persona.label(),
                vote: "N/A".to_string(),
                reason: NO_VOTE.to_string(),
                conditions: String::new(),
            },
            Some(output) => VoteRow {
                persona: persona.label(),
                vote: output.vote.as_str().to_uppercase(),
                reason: output.reason.clone(),
                conditions: output
                    .conditions
                    .as_deref()
                    .map(|conditions| conditions.join(" | "))
                    .unwrap_or_default(),
            },
        })
        .collect()
}

/// Voting phase rendered as a table.
pub fn render_voting_table(voting: &BTreeMap<Persona, VoteOutput>) -> String {
    let mut out = String::from(
        "<table class='voting-table'>\
         <tr><th>Persona</th><th>Vote</th><th>Reason</th><th>Conditions</th></tr>",
    );
    for row in voting_rows(voting) {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(row.persona),
            escape_html(&row.vote),
            escape_html(&row.reason),
            escape_html(&row.conditions),
        ));
    }
    out.push_str("</table>");
    out
}

/// Final decision banner; the conditions list appears only when non-empty.
pub fn render_final_decision(decision: Decision, conditions: &[String]) -> String {
    let mut out = format!(
        "<div class='decision-banner {}'>Final Decision: {}</div>",
        decision.css_class(),
        decision.as_str().to_uppercase()
    );
    if !conditions.is_empty() {
        out.push_str("<div class='decision-conditions'>Conditions:</div><ul>");
        for condition in conditions {
            out.push_str(&format!("<li>{}</li>", escape_html(condition)));
        }
        out.push_str("</ul>");
    }
    out
}

/// Error fragment; the only content shown for a failed run.
pub fn render_error(message: &str) -> String {
    format!(
        "<div class='error-banner'>{}</div>",
        escape_html(message)
    )
}
