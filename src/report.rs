//! Static HTML report of a saved agent history.
//!
//! Each cell is read on its own from the raw JSON, so a step with a missing or
//! mistyped field still renders with that cell left empty. Only entries that
//! are not objects at all are skipped; the remaining rows keep their original
//! 1-based step numbers.

use std::io;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::{Error, Result};

/// One table row, unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    /// 1-based position in the history.
    pub step: usize,
    pub url: String,
    pub title: String,
    /// Base64 PNG, empty when the step has none.
    pub screenshot: String,
    pub goal: String,
    pub thinking: String,
    pub extracted_content: String,
}

/// String at `path` below `value`, or empty when absent or not a string.
fn text_at(value: &Value, path: &[&str]) -> String {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl ReportRow {
    fn from_step(step: usize, value: &Value) -> Self {
        let brain = value
            .get("model_output")
            .and_then(|m| m.get("current_state"))
            .unwrap_or(&Value::Null);
        let thinking = [
            text_at(brain, &["evaluation_previous_goal"]),
            text_at(brain, &["memory"]),
        ]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
        let extracted_content = value
            .get("result")
            .and_then(|r| r.get(0))
            .map(|first| text_at(first, &["extracted_content"]))
            .unwrap_or_default();

        Self {
            step,
            url: text_at(value, &["state", "url"]),
            title: text_at(value, &["state", "title"]),
            screenshot: text_at(value, &["state", "screenshot"]),
            goal: text_at(brain, &["next_goal"]),
            thinking,
            extracted_content,
        }
    }
}

/// Rows for every step of a history document.
///
/// Fails with `InvalidData` when the text is not JSON or has no `history`
/// array.
pub fn rows_from_json(json: &str) -> io::Result<Vec<ReportRow>> {
    let value: Value = serde_json::from_str(json)?;
    let steps = value
        .get("history")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "missing \"history\" array")
        })?;

    let mut rows = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        if !step.is_object() {
            warn!("Skipping history step {}: not an object", i + 1);
            continue;
        }
        rows.push(ReportRow::from_step(i + 1, step));
    }
    Ok(rows)
}

const HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Agent History Report</title>
    <style>
        body { font-family: Arial, sans-serif; }
        table { border-collapse: collapse; width: 100%; table-layout: fixed; }
        th, td {
            border: 1px solid #ccc;
            padding: 14px 10px;
            text-align: left;
            vertical-align: top;
            word-break: break-word;
            white-space: pre-line;
        }
        th { background: #f4f4f4; }
        tr:nth-child(even) { background: #fafbfc; }
        tr:nth-child(odd) { background: #fff; }
        .screenshot-cell { text-align: center; }
        .screenshot {
            max-width: 320px;
            max-height: 200px;
            display: block;
            margin: 0 auto;
            border: 1px solid #bbb;
            box-shadow: 0 2px 8px #eee;
        }
        .goal { font-weight: bold; color: #2a2; }
        .stepnum { font-weight: bold; text-align: center; }
        .monospace { font-family: 'Fira Mono', 'Consolas', 'Menlo', monospace; font-size: 0.98em; }
    </style>
</head>
<body>
    <h1>Agent History Report</h1>
    <table>
        <tr>
            <th style="width: 60px;">Step</th>
            <th style="width: 180px;">URL</th>
            <th style="width: 160px;">Title</th>
            <th style="width: 340px;">Screenshot</th>
            <th style="width: 200px;">Goal</th>
            <th style="width: 260px;">Thinking</th>
            <th style="width: 260px;">Extracted Content</th>
        </tr>
"#;

const FOOTER: &str = "    </table>\n</body>\n</html>\n";

/// Render rows as a complete HTML document.
pub fn render_html(rows: &[ReportRow]) -> String {
    let mut html = String::from(HEADER);
    for row in rows {
        html.push_str("        <tr>");
        html.push_str(&format!(r#"<td class="stepnum">{}</td>"#, row.step));
        html.push_str(&format!("<td>{}</td>", escape_html(&row.url)));
        html.push_str(&format!("<td>{}</td>", escape_html(&row.title)));
        if is_base64(&row.screenshot) {
            html.push_str(&format!(
                concat!(
                    r#"<td class="screenshot-cell"><img class="screenshot" "#,
                    r#"src="data:image/png;base64,{}" alt="Screenshot Step {}"/></td>"#
                ),
                row.screenshot, row.step
            ));
        } else {
            html.push_str(r#"<td class="screenshot-cell"></td>"#);
        }
        html.push_str(&format!(r#"<td class="goal">{}</td>"#, escape_html(&row.goal)));
        html.push_str(&format!(
            r#"<td class="monospace">{}</td>"#,
            escape_html(&row.thinking)
        ));
        html.push_str(&format!(
            r#"<td class="monospace">{}</td>"#,
            escape_html(&row.extracted_content)
        ));
        html.push_str("</tr>\n");
    }
    html.push_str(FOOTER);
    html
}

/// Read `history_path`, write the report to `report_path`, return the row count.
pub fn write_report(history_path: &Path, report_path: &Path) -> Result<usize> {
    let rows = std::fs::read_to_string(history_path)
        .and_then(|json| rows_from_json(&json))
        .map_err(|e| Error::report_io(history_path, e))?;
    std::fs::write(report_path, render_html(&rows))
        .map_err(|e| Error::report_io(report_path, e))?;
    info!("HTML report generated: {} ({} steps)", report_path.display(), rows.len());
    Ok(rows.len())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_base64(data: &str) -> bool {
    !data.is_empty()
        && data
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = r#"{"history": [
        {
            "model_output": {
                "current_state": {
                    "evaluation_previous_goal": "Unknown - fresh start",
                    "memory": "Nothing done yet",
                    "next_goal": "Open the login page"
                },
                "action": [{"go_to_url": {"url": "https://partner.test/login"}}]
            },
            "result": [{
                "extracted_content": "Navigated to https://partner.test/login",
                "include_in_memory": true
            }],
            "state": {"url": "about:blank", "title": "", "screenshot": "iVBORw0KGgo="}
        },
        {
            "model_output": null,
            "result": [{"error": "completion has no content"}],
            "state": {"url": "https://partner.test/login", "title": "Login <Partner>"}
        },
        {
            "model_output": {
                "current_state": {"next_goal": "Finish"},
                "action": [{"done": {"text": "ok"}}]
            },
            "result": [{"is_done": true, "extracted_content": "Login successful & done"}],
            "state": {"url": "https://partner.test/home", "title": "Home"}
        }
    ]}"#;

    fn data_rows(html: &str) -> usize {
        html.matches(r#"<td class="stepnum">"#).count()
    }

    #[test]
    fn test_one_row_per_step() {
        let rows = rows_from_json(HISTORY).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.step).collect::<Vec<_>>(), vec![1, 2, 3]);

        let html = render_html(&rows);
        assert_eq!(data_rows(&html), 3);
        assert!(html.contains(r#"<td class="stepnum">3</td>"#));
    }

    #[test]
    fn test_goal_and_thinking() {
        let rows = rows_from_json(HISTORY).unwrap();
        assert_eq!(rows[0].goal, "Open the login page");
        assert_eq!(rows[0].thinking, "Unknown - fresh start\nNothing done yet");
        assert_eq!(rows[1].goal, "");
        assert_eq!(rows[1].thinking, "");
        assert_eq!(rows[2].thinking, "");
    }

    #[test]
    fn test_first_result_content() {
        let rows = rows_from_json(HISTORY).unwrap();
        assert_eq!(rows[0].extracted_content, "Navigated to https://partner.test/login");
        assert_eq!(rows[1].extracted_content, "");
    }

    #[test]
    fn test_missing_screenshot_leaves_empty_cell() {
        let html = render_html(&rows_from_json(HISTORY).unwrap());
        assert_eq!(html.matches(r#"<td class="screenshot-cell">"#).count(), 3);
        assert_eq!(html.matches(r#"<td class="screenshot-cell"></td>"#).count(), 2);
        assert!(html.contains(
            r#"src="data:image/png;base64,iVBORw0KGgo=" alt="Screenshot Step 1""#
        ));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render_html(&rows_from_json(HISTORY).unwrap());
        assert!(html.contains("<td>Login &lt;Partner&gt;</td>"));
        assert!(html.contains("Login successful &amp; done"));
        assert!(!html.contains("<Partner>"));
    }

    #[test]
    fn test_suspicious_screenshot_is_dropped() {
        let row = ReportRow {
            step: 1,
            screenshot: r#"abc" onerror="alert(1)"#.into(),
            ..Default::default()
        };
        let html = render_html(&[row]);
        assert!(!html.contains("onerror"));
        assert!(html.contains(r#"<td class="screenshot-cell"></td>"#));
    }

    #[test]
    fn test_only_non_object_steps_are_skipped() {
        let json = r#"{"history": [
            "not a step",
            {"state": {"url": 7, "title": "Orders"}},
            {},
            {"state": {"url": "https://a.test"}, "result": []}
        ]}"#;
        let rows = rows_from_json(json).unwrap();
        assert_eq!(rows.iter().map(|r| r.step).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(rows[0].url, "");
        assert_eq!(rows[0].title, "Orders");
        assert_eq!(rows[1], ReportRow { step: 3, ..Default::default() });
        assert_eq!(rows[2].url, "https://a.test");
    }

    #[test]
    fn test_mistyped_fields_keep_the_row() {
        let json = r#"{"history": [
            {
                "state": {"url": "https://a.test/1", "title": 7, "screenshot": false},
                "model_output": {"current_state": {"next_goal": "Open orders", "memory": ["x"]}},
                "result": [{"extracted_content": "opened"}]
            },
            {
                "state": {"url": "https://a.test/2", "title": "Two"},
                "model_output": "garbled",
                "result": [null, {"extracted_content": "second"}]
            },
            {
                "state": {"url": "https://a.test/3", "title": "Three"},
                "result": [{"extracted_content": "clean"}]
            }
        ]}"#;
        let rows = rows_from_json(json).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].url, "https://a.test/1");
        assert_eq!(rows[0].title, "");
        assert_eq!(rows[0].screenshot, "");
        assert_eq!(rows[0].goal, "Open orders");
        assert_eq!(rows[0].thinking, "");
        assert_eq!(rows[0].extracted_content, "opened");

        assert_eq!(rows[1].title, "Two");
        assert_eq!(rows[1].goal, "");
        assert_eq!(rows[1].extracted_content, "");

        assert_eq!(rows[2].extracted_content, "clean");
        assert_eq!(data_rows(&render_html(&rows)), 3);
    }

    #[test]
    fn test_empty_history() {
        let rows = rows_from_json(r#"{"history": []}"#).unwrap();
        let html = render_html(&rows);
        assert_eq!(data_rows(&html), 0);
        assert!(html.contains("<th style=\"width: 260px;\">Thinking</th>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_not_a_history_document() {
        let err = rows_from_json("[]").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let err = rows_from_json("{oops").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_unreadable_history_is_a_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("agent_history.json");
        std::fs::write(&history, "{oops").unwrap();

        let err = write_report(&history, &dir.path().join("r.html")).unwrap_err();
        match err {
            Error::ReportIo { path, source } => {
                assert_eq!(path, history);
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected a report error, got {:?}", other),
        }
        assert!(!dir.path().join("r.html").exists());
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("agent_history.json");
        let report = dir.path().join("agent_history_report.html");
        std::fs::write(&history, HISTORY).unwrap();

        assert_eq!(write_report(&history, &report).unwrap(), 3);
        let html = std::fs::read_to_string(&report).unwrap();
        assert_eq!(data_rows(&html), 3);
    }

    #[test]
    fn test_write_report_missing_history() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_report(&dir.path().join("absent.json"), &dir.path().join("r.html"))
            .unwrap_err();
        assert!(matches!(err, Error::ReportIo { .. }));
    }
}
