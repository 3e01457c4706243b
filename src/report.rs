// Markdown report generation
//
// Renders a ConsensusResult into one self-contained Markdown document and
// derives the export filename from a timestamp. The prompt never
// influences the filename.

use chrono::{DateTime, Local};

use crate::models::{ConsensusResult, Persona};

/// Generates the Markdown export for one completed run.
pub struct ReportGenerator<'a> {
    result: &'a ConsensusResult,
    prompt: &'a str,
    generated_at: DateTime<Local>,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(result: &'a ConsensusResult, prompt: &'a str) -> Self {
        Self {
            result,
            prompt,
            generated_at: Local::now(),
        }
    }

    /// Pin the generation timestamp (footer and filename derivation).
    pub fn with_timestamp(mut self, generated_at: DateTime<Local>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// The complete document: an ordered concatenation of non-empty
    /// sections.
    pub fn generate(&self) -> String {
        let sections = [
            self.header(),
            self.input_section(),
            self.thinking_section(),
            self.debate_section(),
            self.voting_section(),
            self.decision_section(),
            self.footer(),
        ];
        sections
            .into_iter()
            .filter(|section| !section.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn header(&self) -> String {
        "# MAGI System 合議結果レポート".to_string()
    }

    fn input_section(&self) -> String {
        format!("## 入力\n\n```\n{}\n```", self.prompt)
    }

    fn thinking_section(&self) -> String {
        let mut lines = vec!["## Thinking Phase".to_string(), String::new()];
        for persona in Persona::ALL {
            lines.push(format!("### {}", persona.label()));
            lines.push(String::new());
            match self.result.thinking_results.get(&persona) {
                Some(output) if !output.content.is_empty() => {
                    lines.push(output.content.clone());
                }
                _ => lines.push("*No output produced.*".to_string()),
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn debate_section(&self) -> String {
        if self.result.debate_results.is_empty() {
            return "## Debate Phase\n\n*No debate rounds were produced.*".to_string();
        }

        let mut lines = vec!["## Debate Phase".to_string(), String::new()];
        for round in &self.result.debate_results {
            lines.push(format!("### Round {}", round.round_number));
            lines.push(String::new());

            for persona in Persona::ALL {
                lines.push(format!("#### {}", persona.label()));
                lines.push(String::new());

                match round.outputs.get(&persona) {
                    None => lines.push("*No response produced.*".to_string()),
                    Some(output) if output.responses.is_empty() => {
                        lines.push("*No responses generated.*".to_string());
                    }
                    Some(output) => {
                        for (target, response) in &output.responses {
                            lines.push(format!("**To {}:** {}", target.label(), response));
                        }
                    }
                }
                lines.push(String::new());
            }
        }
        lines.join("\n")
    }

    fn voting_section(&self) -> String {
        let mut lines = vec![
            "## Voting Phase".to_string(),
            String::new(),
            "| Persona | Vote | Reason | Conditions |".to_string(),
            "|:--------|:----:|:-------|:-----------|".to_string(),
        ];

        for persona in Persona::ALL {
            let label = persona.label();
            match self.result.voting_results.get(&persona) {
                None => lines.push(format!("| {label} | N/A | No vote recorded. | |")),
                Some(output) => {
                    let vote = output.vote.as_str().to_uppercase();
                    let reason = escape_pipes(&output.reason);
                    let conditions = output
                        .conditions
                        .as_deref()
                        .map(|conditions| escape_pipes(&conditions.join(", ")))
                        .unwrap_or_default();
                    lines.push(format!("| {label} | {vote} | {reason} | {conditions} |"));
                }
            }
        }
        lines.join("\n")
    }

    fn decision_section(&self) -> String {
        let mut lines = vec![
            "## Final Decision".to_string(),
            String::new(),
            format!("**{}**", self.result.final_decision.report_label()),
        ];

        if !self.result.all_conditions.is_empty() {
            lines.push(String::new());
            lines.push("### Conditions".to_string());
            lines.push(String::new());
            for condition in &self.result.all_conditions {
                lines.push(format!("- {condition}"));
            }
        }
        lines.join("\n")
    }

    fn footer(&self) -> String {
        format!(
            "---\n\n*Generated by MAGI GUI at {}*",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Escape literal pipes so table cells cannot break the row.
fn escape_pipes(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Generate the report with the current time.
pub fn generate_report(result: &ConsensusResult, prompt: &str) -> String {
    ReportGenerator::new(result, prompt).generate()
}

/// Filesystem-safe export filename for the given timestamp.
pub fn report_filename(timestamp: DateTime<Local>) -> String {
    format!("magi-report-{}.md", timestamp.format("%Y%m%d-%H%M%S"))
}

/// Export filename for the current time.
pub fn report_filename_now() -> String {
    report_filename(Local::now())
}
