// src/report/render.rs
// =============================================================================
// Thin output wrappers around ReportModel:
// - print_table: human-readable terminal table with a summary
// - to_json: pretty JSON of the whole model
// - render_html: standalone HTML document, one section per seed page
// =============================================================================

use std::fmt::Write as _;

use super::{ReportEntry, ReportModel, SeedReport, SeedStatus};
use crate::checker::Classification;

pub fn to_json(report: &ReportModel) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Prints the report grouped by seed page
pub fn print_table(report: &ReportModel) {
    for seed in &report.seeds {
        println!();
        match &seed.status {
            SeedStatus::Reachable => println!("🌐 {} ({})", seed.label, seed.url),
            SeedStatus::Unreachable { reason } => {
                println!("🚫 {} ({}) unreachable: {}", seed.label, seed.url, reason);
                continue;
            }
        }

        println!("{:<60} {:<14} {:<30}", "URL", "STATUS", "DETAIL");
        println!("{}", "=".repeat(104));

        for entry in &seed.entries {
            println!(
                "{:<60} {:<14} {:<30}",
                truncate(&entry.target_url, 57),
                format_status(entry.classification),
                entry_detail(entry)
            );
        }
        println!("   {}", seed_summary_line(seed));
    }

    let summary = &report.summary;
    println!();
    println!("📊 Summary:");
    println!("   ✅ OK: {}", summary.ok);
    println!("   🔀 Redirect: {}", summary.redirect);
    println!("   ❌ Broken: {}", summary.broken);
    println!("   ⏱️  Timeout: {}", summary.timeout);
    println!("   ⚠️  Error: {}", summary.error);
    println!("   📋 Total: {} ({} unique URLs)", summary.total, summary.unique_urls);
    if summary.unreachable_seeds > 0 {
        println!("   🚫 Unreachable seeds: {}", summary.unreachable_seeds);
    }
}

fn format_status(classification: Classification) -> &'static str {
    match classification {
        Classification::Ok => "✅ OK",
        Classification::Redirect => "🔀 REDIRECT",
        Classification::Broken => "❌ BROKEN",
        Classification::Timeout => "⏱️  TIMEOUT",
        Classification::Error => "⚠️  ERROR",
    }
}

// Status code, redirect target or failure text, whichever explains the entry best
fn entry_detail(entry: &ReportEntry) -> String {
    match (&entry.http_status, &entry.final_url, &entry.failure_kind) {
        (Some(code), Some(final_url), _) => format!("HTTP {} -> {}", code, final_url),
        (Some(code), None, _) => format!("HTTP {}", code),
        (None, _, Some(kind)) => format!("{:?}", kind),
        (None, _, None) => String::new(),
    }
}

// One-line tally for a reachable seed
fn seed_summary_line(seed: &SeedReport) -> String {
    format!(
        "{} links: {} ok, {} redirected, {} with problems",
        seed.entries.len(),
        seed.count(Classification::Ok),
        seed.count(Classification::Redirect),
        seed.problem_count()
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Renders a self-contained HTML page
pub fn render_html(report: &ReportModel) -> String {
    let summary = &report.summary;
    let generated = report.generated_at.format("%B %d, %Y at %H:%M UTC");

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Link Report - {generated}</title>
<style>
  body {{ font-family: system-ui, sans-serif; margin: 0; padding: 2rem; background: #f5f7fa; color: #222; }}
  h1 {{ color: #1a4a7a; }}
  .cards {{ display: flex; gap: 1rem; flex-wrap: wrap; margin: 1.5rem 0; }}
  .card {{ background: #fff; border-radius: 10px; padding: 1rem 1.5rem; box-shadow: 0 1px 4px rgba(0,0,0,.1); text-align: center; }}
  .card .num {{ font-size: 2rem; font-weight: 800; }}
  table {{ border-collapse: collapse; width: 100%; background: #fff; margin-bottom: 2rem; font-size: .875rem; }}
  th {{ background: #2c5f9e; color: #fff; padding: 8px 12px; text-align: left; }}
  td {{ padding: 6px 12px; word-break: break-all; }}
  .ok {{ background: #d4edda; color: #155724; }}
  .redirect {{ background: #fff3cd; color: #856404; }}
  .broken {{ background: #f8d7da; color: #721c24; }}
  .timeout {{ background: #fde8cc; color: #7d4e00; }}
  .error {{ background: #e2e3e5; color: #383d41; }}
  .unreachable {{ color: #721c24; font-weight: 600; }}
  .seed-stats {{ display: flex; gap: 1.5rem; margin: .5rem 0 1rem; font-size: .9rem; }}
</style>
</head>
<body>
<h1>Link Report</h1>
<p>Generated: <strong>{generated}</strong></p>
<div class="cards">
  <div class="card"><div class="num">{ok}</div>Working</div>
  <div class="card"><div class="num">{redirect}</div>Redirected</div>
  <div class="card"><div class="num">{problems}</div>Broken / Timeout / Error</div>
  <div class="card"><div class="num">{total}</div>Total links</div>
</div>
"#,
        ok = summary.ok,
        redirect = summary.redirect,
        problems = summary.problems(),
        total = summary.total,
    );

    for seed in &report.seeds {
        render_seed(&mut html, seed);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_seed(html: &mut String, seed: &SeedReport) {
    let _ = writeln!(
        html,
        r#"<h2>{} <small><a href="{}">{}</a></small></h2>"#,
        escape(&seed.label),
        escape(&seed.url),
        escape(seed.page_title.as_deref().unwrap_or(&seed.url)),
    );

    if let SeedStatus::Unreachable { reason } = &seed.status {
        let _ = writeln!(
            html,
            r#"<p class="unreachable">Seed page unreachable: {}</p>"#,
            escape(reason)
        );
        return;
    }

    let _ = writeln!(
        html,
        r#"<div class="seed-stats"><span>{total} links</span><span class="ok">{ok} working</span><span class="redirect">{redirect} redirected</span><span class="broken">{problems} broken / timeout / error</span></div>"#,
        total = seed.entries.len(),
        ok = seed.count(Classification::Ok),
        redirect = seed.count(Classification::Redirect),
        problems = seed.problem_count(),
    );

    html.push_str("<table>\n<tr><th>Status</th><th>HTTP</th><th>Link label</th><th>URL</th></tr>\n");
    for entry in &seed.entries {
        let final_url = entry
            .final_url
            .as_deref()
            .map(|url| format!(r#"<br><small>&rarr; {}</small>"#, escape(url)))
            .unwrap_or_default();
        let http = entry
            .http_status
            .map(|code| code.to_string())
            .or_else(|| entry.failure_kind.map(|kind| format!("{:?}", kind)))
            .unwrap_or_default();

        let _ = writeln!(
            html,
            r#"<tr class="{class}"><td>{status}</td><td>{http}</td><td>{label}</td><td><a href="{url}">{url}</a>{final_url}</td></tr>"#,
            class = entry.classification.as_str().to_ascii_lowercase(),
            status = entry.classification,
            http = escape(&http),
            label = escape(entry.anchor_text.as_deref().unwrap_or("")),
            url = escape(&entry.target_url),
            final_url = final_url,
        );
    }
    html.push_str("</table>\n");
}

fn escape(text: &str) -> String {
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
