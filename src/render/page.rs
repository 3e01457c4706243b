// Page shell
//
// The GUI is one embedded page: a form that posts the run, live streaming
// panels fed over SSE, and the fully rendered result document returned by
// the run endpoint.

use crate::config::{GuiConfig, MAX_DEBATE_ROUNDS, MIN_DEBATE_ROUNDS};
use crate::models::{ConsensusResult, Persona};

use super::{
    escape_html, render_debate_round, render_error, render_final_decision, render_thinking,
    render_voting_table,
};

const STYLE: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{background:#0a0e12;color:#c8d2dc;font-family:'Cascadia Code','Fira Code',monospace;padding:24px;max-width:1100px;margin:0 auto}
.app-title{font-size:1.6rem;color:#ff7a1a;letter-spacing:4px;margin-bottom:4px}
.app-subtitle{color:#5e6a76;margin-bottom:24px}
.section-title{font-size:1.05rem;color:#3fb950;text-transform:uppercase;letter-spacing:2px;margin:28px 0 12px;border-bottom:1px solid #1d2630;padding-bottom:6px}
form .field{display:flex;flex-direction:column;gap:4px;margin-bottom:14px}
form label{font-size:.72rem;color:#5e6a76;text-transform:uppercase;letter-spacing:.5px}
form input,form select,form textarea{background:#10161d;border:1px solid #242f3a;color:#c8d2dc;padding:8px 10px;border-radius:6px;font-family:inherit;font-size:.9rem}
form textarea{min-height:140px}
.run-button{border:none;background:#b62324;color:#fff;padding:10px 26px;border-radius:6px;font-family:inherit;font-size:.95rem;letter-spacing:2px;cursor:pointer}
.run-button:hover{background:#da3633}
.persona-columns{display:grid;grid-template-columns:repeat(3,1fr);gap:12px}
.persona-card{background:#10161d;border:1px solid #242f3a;border-radius:8px;padding:12px;margin-bottom:12px}
.persona-title{font-weight:700;letter-spacing:2px;margin-bottom:8px}
.persona-melchior .persona-title{color:#ff7a1a}
.persona-balthasar .persona-title{color:#3fb950}
.persona-casper .persona-title{color:#58a6ff}
.persona-content{white-space:pre-wrap;word-wrap:break-word;font-size:.85rem;line-height:1.5}
.debate-round{border:1px solid #1d2630;border-radius:8px;padding:12px;margin-bottom:14px}
.round-title{color:#8b949e;margin-bottom:10px}
.voting-table{width:100%;border-collapse:collapse;font-size:.85rem}
.voting-table th,.voting-table td{border:1px solid #242f3a;padding:8px 10px;text-align:left;vertical-align:top}
.voting-table th{color:#8b949e;text-transform:uppercase;font-size:.72rem;letter-spacing:1px}
.decision-banner{padding:16px;border-radius:8px;font-size:1.1rem;letter-spacing:2px;text-align:center;margin-bottom:12px}
.decision-approved{background:#0d2818;color:#3fb950;border:1px solid #1f6e37}
.decision-denied{background:#2d1011;color:#ff6b68;border:1px solid #b62324}
.decision-conditional{background:#2b2008;color:#e3b341;border:1px solid #9e6a03}
.decision-conditions{color:#8b949e;margin-bottom:6px}
ul{margin:0 0 12px 22px}
.error-banner{background:#2d1011;border:1px solid #b62324;color:#ff6b68;padding:14px;border-radius:8px}
.download-link{display:inline-block;background:#1f6feb;color:#fff;text-decoration:none;padding:10px 20px;border-radius:6px}
.stream-pane{display:none}
.stream-pane.active{display:block}
a{color:#58a6ff}
"#;

const STREAM_SCRIPT: &str = r#"
const form = document.getElementById('run-form');
form.addEventListener('submit', (ev) => {
  if (!document.getElementById('streaming').checked) return;
  ev.preventDefault();

  const pane = document.getElementById('stream-pane');
  pane.classList.add('active');
  const buffers = {melchior: [], balthasar: [], casper: []};
  const source = new EventSource('/stream');
  source.onmessage = (msg) => {
    const chunk = JSON.parse(msg.data);
    if (chunk.phase !== 'debate') return;
    const buffer = buffers[chunk.persona];
    const target = document.getElementById('stream-' + chunk.persona);
    if (!buffer || !target) return;
    buffer.push(chunk.chunk);
    target.textContent = buffer.join('\n\n');
  };

  fetch('/run', {method: 'POST', body: new FormData(form)})
    .then((resp) => resp.text())
    .then((html) => {
      source.close();
      document.open();
      document.write(html);
      document.close();
    })
    .catch((err) => {
      source.close();
      pane.insertAdjacentHTML('beforeend', '<div class="error-banner"></div>');
      pane.lastChild.textContent = 'Run failed: ' + err;
    });
});
"#;

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang='en'>\n<head>\n<meta charset='utf-8'>\n\
         <meta name='viewport' content='width=device-width, initial-scale=1'>\n\
         <title>MAGI SYSTEM</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <div class='app-title'>MAGI SYSTEM</div>\n\
         <div class='app-subtitle'>Triadic consensus with Gemini.</div>\n\
         {body}\n</body>\n</html>\n"
    )
}

/// The input page: configuration form plus the live streaming panels.
pub fn index_page(config: &GuiConfig) -> String {
    let model_options: String = crate::config::GeminiModel::ALL
        .into_iter()
        .map(|model| {
            let selected = if model == config.model { " selected" } else { "" };
            format!("<option value='{m}'{selected}>{m}</option>", m = model.as_str())
        })
        .collect();

    let streaming_checked = if config.streaming_enabled { " checked" } else { "" };

    let stream_panes: String = Persona::ALL
        .into_iter()
        .map(|persona| {
            format!(
                "<div class='persona-card {css}'><div class='persona-title'>{label}</div>\
                 <pre class='persona-content' id='stream-{id}'></pre></div>",
                css = persona.css_class(),
                label = persona.label(),
                id = persona.as_str(),
            )
        })
        .collect();

    let body = format!(
        "<div class='section-title'>Configuration</div>\n\
         <form id='run-form' method='post' action='/run' enctype='multipart/form-data'>\n\
         <div class='field'><label>Gemini API key</label>\
         <input type='password' name='api_key' value='{api_key}'></div>\n\
         <div class='field'><label>Gemini model</label>\
         <select name='model'>{model_options}</select></div>\n\
         <div class='field'><label>Debate rounds ({min}-{max})</label>\
         <input type='number' name='debate_rounds' min='{min}' max='{max}' value='{rounds}'></div>\n\
         <div class='field'><label>Streaming (experimental)</label>\
         <input type='checkbox' id='streaming' name='streaming'{streaming_checked}></div>\n\
         <div class='field'><label>Attachments (PDF, images; max 10MB each)</label>\
         <input type='file' name='attachments' multiple></div>\n\
         <div class='section-title'>Input</div>\n\
         <div class='field'><label>Prompt</label>\
         <textarea name='prompt' placeholder='Describe the decision to evaluate.'></textarea></div>\n\
         <button class='run-button' type='submit'>INITIALIZE</button>\n\
         </form>\n\
         <div class='stream-pane' id='stream-pane'>\
         <div class='section-title'>Debate (Streaming)</div>\
         <div class='persona-columns'>{stream_panes}</div></div>\n\
         <script>{STREAM_SCRIPT}</script>",
        api_key = escape_html(&config.api_key),
        min = MIN_DEBATE_ROUNDS,
        max = MAX_DEBATE_ROUNDS,
        rounds = config.debate_rounds,
    );
    document(&body)
}

/// The fully rendered result document. All phase sections are present, or
/// none are (a failed run renders only the error page).
pub fn result_page(result: &ConsensusResult) -> String {
    let mut body = String::new();

    body.push_str("<div class='section-title'>Thinking</div>");
    body.push_str(&render_thinking(&result.thinking_results));

    body.push_str("<div class='section-title'>Debate</div>");
    if result.debate_results.is_empty() {
        body.push_str("<p>No debate rounds were produced.</p>");
    } else {
        for round in &result.debate_results {
            body.push_str(&format!(
                "<div class='debate-round'><div class='round-title'>Round {}</div>{}</div>",
                round.round_number,
                render_debate_round(round)
            ));
        }
    }

    body.push_str("<div class='section-title'>Voting</div>");
    body.push_str(&render_voting_table(&result.voting_results));

    body.push_str("<div class='section-title'>Final Decision</div>");
    body.push_str(&render_final_decision(
        result.final_decision,
        &result.all_conditions,
    ));

    body.push_str("<div class='section-title'>Export</div>");
    body.push_str("<a class='download-link' href='/report'>Download Report (Markdown)</a>");
    body.push_str("<p><a href='/'>New run</a></p>");

    document(&body)
}

/// A failed run: the error is the only content.
pub fn error_page(message: &str) -> String {
    let body = format!(
        "{}\n<p><a href='/'>Back</a></p>",
        render_error(message)
    );
    document(&body)
}
