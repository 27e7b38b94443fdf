//! System prompt and the per-step messages sent to the model.

use std::collections::VecDeque;

use serde_json::{json, Value};

use crate::observe::element_list;
use crate::session::BrowserState;

/// Elements beyond this are summarized as a count.
const MAX_ELEMENTS_IN_PROMPT: usize = 150;

pub(crate) const SYSTEM_PROMPT: &str = r#"You are a browser automation agent. You control a real browser to accomplish the user's task.

Each turn you receive the current URL, page title, and a list of interactive elements:
  [index] <tag type="x"> "text" placeholder="y"
Use the index to refer to an element. Indices are only valid for the current turn.

Answer with exactly one JSON object and nothing else:
{
  "current_state": {
    "evaluation_previous_goal": "Success|Failed|Unknown - short analysis of the last actions",
    "memory": "what has been done so far and what to remember",
    "next_goal": "what the next actions should achieve"
  },
  "action": [ {"<action_name>": {<parameters>}}, ... ]
}

Available actions:
- {"go_to_url": {"url": "https://..."}}
- {"go_back": {}}
- {"click_element": {"index": 3}}
- {"input_text": {"index": 2, "text": "hello"}}
- {"send_keys": {"keys": "Enter"}}
- {"scroll_down": {"amount": 600}}  (amount in pixels, omit for one page)
- {"scroll_up": {"amount": 600}}
- {"extract_content": {"goal": "what to look for"}}
- {"wait": {"seconds": 3}}
- {"done": {"text": "final answer for the user", "success": true}}

RULES:
- Actions run in order. After a click or navigation the remaining actions are dropped, because the page changed.
- Fill several form fields in one turn, then submit.
- If an action fails, try a different approach.
- When the task is complete, or cannot be completed, call done. Put everything the user asked for (including the final URL) in its text.
- Never ask for confirmation. You are fully autonomous.
"#;

/// Build the message list for one step.
///
/// `memory` holds the most recent step summaries; `omitted` counts the older
/// ones that were dropped from it.
pub(crate) fn build_messages(
    task: &str,
    memory: &VecDeque<String>,
    omitted: usize,
    state: &BrowserState,
    step: usize,
    max_steps: usize,
) -> Vec<Value> {
    let mut messages = vec![
        json!({ "role": "system", "content": SYSTEM_PROMPT }),
        json!({ "role": "user", "content": format!("Your task: {}", task) }),
    ];

    if !memory.is_empty() {
        let mut history = String::from("Previous steps:\n");
        if omitted > 0 {
            history.push_str(&format!("({} earlier steps omitted)\n", omitted));
        }
        for line in memory {
            history.push_str(line);
            history.push('\n');
        }
        messages.push(json!({ "role": "user", "content": history }));
    }

    let text = state_text(state, step, max_steps);
    let content = match state.screenshot {
        Some(ref b64) => json!([
            { "type": "text", "text": text },
            {
                "type": "image_url",
                "image_url": { "url": format!("data:image/png;base64,{}", b64) }
            }
        ]),
        None => json!(text),
    };
    messages.push(json!({ "role": "user", "content": content }));
    messages
}

fn state_text(state: &BrowserState, step: usize, max_steps: usize) -> String {
    let mut out = format!(
        "Step {} of {}\nCurrent URL: {}\nTitle: {}\nInteractive elements:\n",
        step, max_steps, state.url, state.title
    );
    if state.elements.is_empty() {
        out.push_str("(none found - navigate or scroll)\n");
    } else {
        let shown = &state.elements[..state.elements.len().min(MAX_ELEMENTS_IN_PROMPT)];
        out.push_str(&element_list(shown));
        if state.elements.len() > shown.len() {
            out.push_str(&format!(
                "[...{} total elements, showing first {}]\n",
                state.elements.len(),
                shown.len()
            ));
        }
    }
    out
}
