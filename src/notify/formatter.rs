//! 通知内容格式化
//!
//! 单条投递与每轮汇总各有固定的标题、纯文本与 HTML 正文。

use serde::Serialize;

use crate::models::{ApplicationRecord, ApplicationStatus, CycleReport};

const SIGNATURE: &str = "— Job Application Bot (automated)";

/// 一条待发送的通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 单条投递成功的通知
pub fn application_message(record: &ApplicationRecord) -> Message {
    let p = &record.posting;
    let subject = format!("Applied: {} @ {} ({})", p.title, p.company, p.platform);

    let text = format!(
        "Your bot just submitted an application!\n\n\
         Platform:  {}\n\
         Company:   {}\n\
         Role:      {}\n\
         Link:      {}\n\n\
         {}",
        p.platform, p.company, p.title, p.url, SIGNATURE
    );

    let html = format!(
        "<html><body>\
         <h2>Application submitted</h2>\
         <table border=\"0\" cellpadding=\"4\">\
         <tr><td><b>Platform</b></td><td>{}</td></tr>\
         <tr><td><b>Company</b></td><td>{}</td></tr>\
         <tr><td><b>Role</b></td><td>{}</td></tr>\
         <tr><td><b>Link</b></td><td><a href=\"{url}\">{url}</a></td></tr>\
         </table>\
         <p><i>{}</i></p>\
         </body></html>",
        p.platform,
        escape_html(&p.company),
        escape_html(&p.title),
        SIGNATURE,
        url = escape_html(&p.url),
    );

    Message { subject, text, html }
}

/// 每轮汇总通知
pub fn summary_message(report: &CycleReport) -> Message {
    let summary = &report.summary;
    let date = summary.finished_at.format("%Y-%m-%d %H:%M").to_string();
    let applied = summary.total_applied;
    let failed = summary.total_failed();
    let skipped = summary.total_skipped() + summary.total_duplicate();

    let submitted: Vec<String> = report
        .records
        .iter()
        .filter(|r| r.status == ApplicationStatus::Submitted)
        .map(|r| format!("{} — {}", r.posting.company, r.posting.title))
        .collect();

    let subject = format!(
        "Job Bot Report — {} | {} applied, {} failed",
        date, applied, failed
    );

    let mut lines = vec![
        "Job Application Bot — Run Summary".to_string(),
        "=".repeat(50),
        format!("Date:        {}", date),
        format!("Applied:     {}", applied),
        format!("Skipped:     {}  (duplicate / already applied / unresolved)", skipped),
        format!("Failed:      {}", failed),
    ];

    for counts in &summary.platforms {
        let mut line = format!(
            "  {}: {} applied, {} skipped, {} duplicate, {} failed",
            counts.platform, counts.submitted, counts.skipped, counts.duplicate, counts.failed
        );
        if let Some(note) = &counts.auth_failure {
            line.push_str(&format!("  [login failed: {}]", note));
        }
        if let Some(halt) = counts.halted {
            line.push_str(&format!("  [halted: {}]", halt.as_str()));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push("Applications submitted:".to_string());
    lines.push("-".repeat(40));
    if submitted.is_empty() {
        lines.push("  (none)".to_string());
    }
    for (i, entry) in submitted.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, entry));
    }
    lines.push(String::new());
    lines.push(SIGNATURE.to_string());

    let rows: String = submitted
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("<tr><td>{}</td><td>{}</td></tr>", i + 1, escape_html(entry)))
        .collect();

    let html = format!(
        "<html><body>\
         <h2>Job Application Bot — Run Summary</h2>\
         <table border=\"0\" cellpadding=\"4\">\
         <tr><td><b>Date</b></td><td>{}</td></tr>\
         <tr><td><b>Applied</b></td><td>{}</td></tr>\
         <tr><td><b>Skipped</b></td><td>{}</td></tr>\
         <tr><td><b>Failed</b></td><td>{}</td></tr>\
         </table>\
         <h3>Applications Submitted</h3>\
         <table border=\"1\" cellpadding=\"4\" cellspacing=\"0\">\
         <tr><th>#</th><th>Company — Role</th></tr>{}\
         </table>\
         <p><i>{}</i></p>\
         </body></html>",
        date, applied, skipped, failed, rows, SIGNATURE
    );

    Message {
        subject,
        text: lines.join("\n"),
        html,
    }
}
