//! The single dashboard page.
//!
//! Rendered with `format!`/`write!` into a `String`. Every value that came
//! from the user, the PDF or a remote service goes through [`escape_html`].

use crate::schedule::{FaqMap, ScheduleEntry};
use crate::session::{Notice, NoticeKind};
use std::fmt::Write as _;
use tracing::warn;

/// Everything one render needs, already taken out of the session.
#[derive(Debug)]
pub struct PageView<'a> {
    pub notices: Vec<Notice>,
    pub faq: &'a FaqMap,
    pub schedule: &'a [ScheduleEntry],
    pub summary: &'a str,
    pub ocr_text: &'a str,
    pub answer: Option<String>,
    pub mock: bool,
}

/// Escape text for use in element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const FAQ_CARDS: [(&str, &str, &str); 3] = [
    ("late_work_policy", "📌 Late Work Policy", "faq-item"),
    ("attendance_policy", "🧍 Attendance Policy", "faq-item"),
    ("course_structure", "🏗️ Course Structure", "faq-item faq-wide"),
];

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str(HEAD);

    html.push_str("  <main class=\"container\" role=\"main\">\n");
    push_notices(&mut html, &view.notices);
    html.push_str("    <section class=\"grid stack-l\">\n");
    push_upload_card(&mut html, view.summary);
    push_ask_card(&mut html, view.answer.as_deref(), !view.ocr_text.is_empty());
    if !view.faq.is_empty() {
        push_faq_card(&mut html, view.faq);
    }
    if !view.schedule.is_empty() {
        push_schedule_cards(&mut html, view.schedule);
    }
    if !view.ocr_text.is_empty() {
        let _ = write!(
            html,
            r#"      <div class="card col-12 stack-m">
        <h2>Raw OCR Text</h2>
        <details class="disclosure">
          <summary>Toggle OCR text</summary>
          <pre class="code" aria-label="OCR text">{}</pre>
        </details>
      </div>
"#,
            escape_html(view.ocr_text)
        );
    }
    html.push_str("    </section>\n");

    html.push_str("    <footer class=\"footer\">\n      <span>Built with axum, Cloud Vision and edgequake-llm.</span>\n");
    if view.mock {
        html.push_str(
            "      <span class=\"pill\" title=\"Using built-in demo data\">Mock Mode</span>\n",
        );
    }
    html.push_str("    </footer>\n  </main>\n</body>\n</html>\n");
    html
}

fn push_notices(html: &mut String, notices: &[Notice]) {
    if notices.is_empty() {
        return;
    }
    html.push_str("    <div class=\"alerts\" role=\"status\" aria-live=\"polite\">\n");
    for notice in notices {
        let class = match notice.kind {
            NoticeKind::Success => "ok",
            NoticeKind::Error => "err",
        };
        let _ = writeln!(
            html,
            "      <div class=\"alert {class}\">{}</div>",
            escape_html(&notice.message)
        );
    }
    html.push_str("    </div>\n");
}

fn push_upload_card(html: &mut String, summary: &str) {
    html.push_str(
        r#"      <div class="card col-8 stack-m" aria-labelledby="uploadTitle">
        <h2 id="uploadTitle">Upload Syllabus (PDF)</h2>
        <p class="subtle">The PDF is OCR'd page by page, policies and schedule are extracted by the language model, then charted.</p>
        <form method="POST" action="/upload" enctype="multipart/form-data" class="form-row" aria-label="Upload PDF">
          <input class="input" type="file" name="pdf" accept="application/pdf" required aria-label="Choose PDF file" />
          <button class="btn" type="submit">Process PDF</button>
        </form>
"#,
    );
    if !summary.is_empty() {
        let _ = write!(
            html,
            r#"        <hr class="divider" />
        <details class="disclosure" open>
          <summary><strong>Summary</strong> (auto-generated)</summary>
          <p class="subtle">{}</p>
        </details>
"#,
            escape_html(summary)
        );
    }
    html.push_str("      </div>\n");
}

fn push_ask_card(html: &mut String, answer: Option<&str>, has_text: bool) {
    let disabled = if has_text {
        ""
    } else {
        " disabled aria-disabled=\"true\""
    };
    let _ = write!(
        html,
        r#"      <div class="card col-4 stack-m" aria-labelledby="askTitle">
        <h2 id="askTitle">Ask a Question</h2>
        <p class="subtle">Ask anything about this course's policies or schedule.</p>
        <form method="POST" action="/ask" class="form-row" aria-label="Ask a question">
          <input class="input" type="text" name="question" placeholder="e.g., What's the late submission penalty?" required aria-label="Your question" />
          <button class="btn" type="submit"{disabled}>Ask</button>
        </form>
"#
    );
    if let Some(answer) = answer {
        let _ = write!(
            html,
            "        <hr class=\"divider\" />\n        <div class=\"answer\" aria-live=\"polite\"><strong>Answer:</strong> {}</div>\n",
            escape_html(answer)
        );
    }
    html.push_str("      </div>\n");
}

fn push_faq_card(html: &mut String, faq: &FaqMap) {
    html.push_str("      <div class=\"card col-12 stack-m\">\n        <h2>Extracted FAQs</h2>\n        <div class=\"faq-grid\">\n");
    for (key, title, class) in FAQ_CARDS {
        let _ = write!(
            html,
            "          <div class=\"{class}\">\n            <h3>{title}</h3>\n            <div class=\"subtle\">{}</div>\n          </div>\n",
            escape_html(faq.get(key))
        );
    }
    html.push_str("        </div>\n      </div>\n");
}

fn push_schedule_cards(html: &mut String, schedule: &[ScheduleEntry]) {
    let json = serde_json::to_string_pretty(schedule).unwrap_or_else(|e| {
        warn!("Could not serialise schedule for display: {}", e);
        "[]".to_string()
    });
    let _ = write!(
        html,
        r#"      <div class="card col-8 stack-m">
        <h2>Grade % by Week (Cumulative)</h2>
        <img class="chart" src="/chart/weights" alt="Line chart of cumulative grade percentage by week" />
        <p class="subtle">Shows the cumulative portion of the final grade allocated up to each week.</p>
      </div>
      <div class="card col-4 stack-m">
        <h2>Assignments by Week</h2>
        <img class="chart" src="/chart/assignments" alt="Bar chart of number of assignments per week" />
        <p class="subtle">Counts of assessments/assignments detected for each week.</p>
      </div>
      <div class="card col-12 stack-m">
        <h2>Structured Schedule (JSON)</h2>
        <pre class="code">{}</pre>
      </div>
"#,
        escape_html(&json)
    );
}

const HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Syllabus FAQ Dashboard</title>
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <style>
    :root {
      --bg: #0b1020; --surface: #0f172a; --elev: #111827; --border: #1f2937;
      --text: #e5e7eb; --muted: #9fb0c2; --accent: #22d3ee; --accent-2: #3b82f6;
      --ok: #34d399; --err: #ef4444;
      --font-sans: Inter, ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif;
      --radius-s: 10px; --radius-m: 14px; --max-w: 1200px; --grid-gap: 18px;
    }
    @media (prefers-color-scheme: light) {
      :root { --bg: #f6f7fb; --surface: #ffffff; --elev: #ffffff; --border: #e5e7eb; --text: #0b1020; --muted: #5b6b7f; }
      .pill { background: #f1f5f9; color: #334155; border-color: #e2e8f0; }
    }
    * { box-sizing: border-box; }
    body { margin: 0; background: var(--bg); color: var(--text); font: 500 15px/1.55 var(--font-sans); }
    .container { max-width: var(--max-w); margin: 0 auto; padding: 28px 20px; }
    header.site { background: rgba(15,23,42,.8); border-bottom: 1px solid var(--border); position: sticky; top: 0; z-index: 20; }
    .header-inner { max-width: var(--max-w); margin: 0 auto; padding: 14px 20px; display: flex; align-items: center; gap: 14px; }
    .brand { display: flex; align-items: center; gap: 10px; }
    .brand h1 { font-size: 24px; margin: 0; }
    .pill { display: inline-flex; padding: 4px 10px; border-radius: 999px; font-size: 12px; background: #0d1b2a; border: 1px solid var(--border); color: var(--muted); }
    .grid { display: grid; grid-template-columns: repeat(12, minmax(0, 1fr)); gap: var(--grid-gap); }
    .col-8 { grid-column: span 8; } .col-4 { grid-column: span 4; } .col-12 { grid-column: span 12; }
    @media (max-width: 980px) { .col-8, .col-4 { grid-column: span 12; } }
    .card { background: var(--elev); border: 1px solid var(--border); border-radius: var(--radius-m); padding: 20px; }
    .card h2 { margin: 0 0 10px 0; font-size: 20px; }
    .subtle { color: var(--muted); }
    .form-row { display: flex; gap: 14px; align-items: center; flex-wrap: wrap; }
    .input, .btn { border-radius: var(--radius-s); border: 1px solid var(--border); padding: 12px 14px; font: inherit; }
    .input { width: 100%; background: var(--surface); color: var(--text); }
    .btn { background: linear-gradient(90deg, var(--accent), var(--accent-2)); color: white; border: 0; cursor: pointer; font-weight: 600; }
    .btn[disabled] { opacity: .6; cursor: not-allowed; }
    .alerts { display: grid; gap: 10px; margin-bottom: 14px; }
    .alert { padding: 10px 14px; border-radius: var(--radius-s); border: 1px solid var(--border); background: var(--surface); }
    .alert.ok { background: rgba(52,211,153,.12); }
    .alert.err { background: rgba(239,68,68,.12); }
    .faq-grid { display: grid; gap: var(--grid-gap); grid-template-columns: repeat(12, minmax(0,1fr)); }
    .faq-item { grid-column: span 6; background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius-s); padding: 14px; }
    .faq-item h3 { margin: 0 0 6px 0; font-size: 17px; }
    .faq-wide { grid-column: 1 / -1; }
    @media (max-width: 820px) { .faq-item { grid-column: span 12; } }
    .chart { width: 100%; height: auto; border-radius: var(--radius-s); border: 1px solid var(--border); background: var(--surface); }
    details.disclosure { border: 1px dashed var(--border); border-radius: var(--radius-s); padding: 10px 14px; background: var(--surface); }
    summary { cursor: pointer; font-weight: 600; }
    pre.code { white-space: pre-wrap; font-size: 12px; background: var(--surface); padding: 14px; border-radius: var(--radius-s); border: 1px solid var(--border); max-height: 420px; overflow: auto; }
    .stack-m > * + * { margin-top: 14px; }
    .divider { height: 1px; background: var(--border); margin: 14px 0; border: 0; }
    .footer { color: var(--muted); margin-top: 28px; display: flex; align-items: center; gap: 10px; }
  </style>
</head>
<body>
  <header class="site" role="banner">
    <div class="header-inner">
      <div class="brand"><div aria-hidden="true">📚</div><h1>Syllabus FAQ Dashboard</h1></div>
    </div>
  </header>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"A & B's"</b>"#),
            "&lt;b&gt;&quot;A &amp; B&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn empty_session_page_has_forms_only() {
        let faq = FaqMap::default();
        let html = render_page(&PageView {
            notices: Vec::new(),
            faq: &faq,
            schedule: &[],
            summary: "",
            ocr_text: "",
            answer: None,
            mock: false,
        });
        assert!(html.contains("action=\"/upload\""));
        assert!(html.contains("action=\"/ask\""));
        assert!(html.contains("disabled aria-disabled"));
        assert!(!html.contains("Extracted FAQs"));
        assert!(!html.contains("/chart/weights"));
        assert!(!html.contains("Mock Mode"));
    }

    #[test]
    fn populated_page_shows_everything_escaped() {
        let faq = mock::faq();
        let schedule = mock::schedule();
        let html = render_page(&PageView {
            notices: vec![Notice::error("<script>alert(1)</script>")],
            faq: &faq,
            schedule: &schedule,
            summary: mock::SUMMARY,
            ocr_text: "Week 1 <intro>",
            answer: Some("Late work loses 10%".into()),
            mock: true,
        });
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("alert err"));
        assert!(html.contains("Extracted FAQs"));
        assert!(html.contains("/chart/assignments"));
        assert!(html.contains("&quot;weight_pct&quot;: 20.0"));
        assert!(html.contains("Week 1 &lt;intro&gt;"));
        assert!(html.contains("<strong>Answer:</strong> Late work loses 10%"));
        assert!(html.contains("Mock Mode"));
        assert!(!html.contains("disabled aria-disabled"));
    }
}
