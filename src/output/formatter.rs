use std::collections::{BTreeMap, BTreeSet};
use std::io::IsTerminal;

use anyhow::{Context, Result};
use chrono::Duration;
use owo_colors::OwoColorize;
use serde_json::Value;
use terminal_size::{terminal_size, Width};

use crate::fairness::{AuditStatus, FairnessReport, RiskLevel};
use crate::jobs::{AnalysisJob, JobStatus, JobSummary};
use crate::store::ResultRecord;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
fn truncate(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// One decimal, right-aligned to 5 chars ("100.0").
pub fn format_score(score: f64) -> String {
    format!("{:>5.1}", score)
}

fn paint_score(score: f64, text: &str, use_colors: bool) -> String {
    if !use_colors {
        return text.to_string();
    }
    if score >= 80.0 {
        text.green().bold().to_string()
    } else if score >= 60.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format results as a table with columns: Index, Hybrid, Grade, Text,
/// Quant, Quality, Subject, Strengths. No headers.
pub fn format_results_table(results: &[ResultRecord], use_colors: bool) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let term_width = get_terminal_width();
    let subject_width = results
        .iter()
        .map(|r| r.subject_id.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);
    // index(4) + three scores(5 each) + grade(3) + quality(6) + separators
    let fixed_width = 4 + 5 * 3 + 3 + 6 + subject_width + 2 * 6;

    results
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let index_str = format!("{:>3}.", idx + 1);
            let hybrid = format_score(r.result.hybrid.score);
            let grade = format!("{:<3}", r.result.hybrid.grade.label());
            let text = if r.result.text_available {
                format_score(r.result.text.score)
            } else {
                format!("{:>5}", "-")
            };
            let quant = format_score(r.result.quant.score);
            let quality = format!("{:<6}", r.result.quant.data_quality.as_str());
            let subject = format!("{:<width$}", truncate(&r.subject_id, subject_width), width = subject_width);
            let strengths = r.result.explanation.strengths.join(", ");
            let strengths = match term_width {
                Some(width) if width > fixed_width + 10 => truncate(&strengths, width - fixed_width),
                Some(_) => truncate(&strengths, 20),
                None => strengths,
            };

            if use_colors {
                format!(
                    "{} {}  {}  {}  {}  {}  {}  {}",
                    index_str.dimmed(),
                    paint_score(r.result.hybrid.score, &hybrid, true),
                    grade.bold(),
                    text.dimmed(),
                    quant.dimmed(),
                    quality.cyan(),
                    subject,
                    strengths
                )
            } else {
                format!(
                    "{} {}  {}  {}  {}  {}  {}  {}",
                    index_str, hybrid, grade, text, quant, quality, subject, strengths
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tsv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.replace(['\t', '\n', '\r'], " "),
        Some(other) => other.to_string(),
    }
}

/// Format results as tab-separated values for scripting.
///
/// The first line is a header: `subject_id` followed by every metric key
/// present in any row, sorted. Rows missing a key leave the cell empty.
pub fn format_results_tsv(results: &[ResultRecord]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let rows: Vec<BTreeMap<String, Value>> = results.iter().map(ResultRecord::payload).collect();
    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .filter(|k| *k != "subject_id")
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        std::iter::once("subject_id")
            .chain(columns.iter().copied())
            .collect::<Vec<_>>()
            .join("\t"),
    );
    for row in &rows {
        lines.push(
            std::iter::once("subject_id")
                .chain(columns.iter().copied())
                .map(|col| tsv_cell(row.get(col)))
                .collect::<Vec<_>>()
                .join("\t"),
        );
    }
    lines.join("\n")
}

/// Pretty JSON array of full result records.
pub fn format_results_json(results: &[ResultRecord]) -> Result<String> {
    serde_json::to_string_pretty(results).context("Failed to serialize results")
}

fn paint_status(status: JobStatus, use_colors: bool) -> String {
    let label = status.as_str();
    if !use_colors {
        return label.to_string();
    }
    match status {
        JobStatus::Completed => label.green().to_string(),
        JobStatus::Failed => label.red().bold().to_string(),
        JobStatus::Processing => label.yellow().to_string(),
        JobStatus::Queued => label.dimmed().to_string(),
    }
}

/// Multi-line job state
pub fn format_job_status(job: &AnalysisJob, use_colors: bool) -> String {
    let mut lines = vec![
        format!("Job: {}", if use_colors { job.id.bold().to_string() } else { job.id.clone() }),
        format!("  Dataset: {}", job.dataset_ref),
        format!("  Status: {}", paint_status(job.status, use_colors)),
        format!(
            "  Progress: {:.1}% ({} processed, {} skipped, {} total)",
            job.progress, job.processed_count, job.skipped_count, job.total_count
        ),
        format!("  Mode: {}", job.options.mode),
    ];
    if let Some(avg) = job.average_score {
        lines.push(format!("  Average score: {:.1}", avg));
    }
    lines.push(format!("  Created: {}", job.created_at.to_rfc3339()));
    if let Some(done) = job.completed_at {
        lines.push(format!("  Completed: {}", done.to_rfc3339()));
    }
    if let Some(error) = &job.error {
        let error = if use_colors { error.red().to_string() } else { error.clone() };
        lines.push(format!("  Error: {}", error));
    }
    lines.join("\n")
}

/// Format finished jobs as one line each: id, status, average, counts, age.
pub fn format_job_list(jobs: &[JobSummary], use_colors: bool) -> String {
    if jobs.is_empty() {
        return "No completed jobs found.".to_string();
    }

    let now = chrono::Utc::now();
    jobs.iter()
        .map(|job| {
            let avg = job
                .average_score
                .map(format_score)
                .unwrap_or_else(|| format!("{:>5}", "-"));
            let age = job
                .completed_at
                .map(|t| format_age(now - t))
                .unwrap_or_else(|| "-".to_string());
            let counts = format!("{}/{}", job.processed_count, job.total_count);
            if use_colors {
                format!(
                    "{}  {}  {}  {:>9}  {:>4}  {}",
                    job.id.bold(),
                    paint_status(job.status, true),
                    avg,
                    counts,
                    age.dimmed(),
                    job.dataset_ref.cyan()
                )
            } else {
                format!(
                    "{}  {}  {}  {:>9}  {:>4}  {}",
                    job.id,
                    job.status,
                    avg,
                    counts,
                    age,
                    job.dataset_ref
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn paint_risk(risk: RiskLevel, use_colors: bool) -> String {
    let label = risk.to_string();
    if !use_colors {
        return label;
    }
    match risk {
        RiskLevel::Low => label.green().to_string(),
        RiskLevel::Medium => label.yellow().bold().to_string(),
        RiskLevel::High => label.red().bold().to_string(),
    }
}

/// Human-readable fairness report
pub fn format_fairness_report(report: &FairnessReport, use_colors: bool) -> String {
    if report.status == AuditStatus::NoData {
        return report.recommendations.join("\n");
    }

    let mut lines = vec![format!(
        "Fairness audit: {} results, risk {}",
        report.total_analyzed,
        paint_risk(report.risk_level, use_colors)
    )];

    let analyses = report
        .attributes
        .iter()
        .chain(report.intersectional.as_ref().map(|i| &i.analysis));
    for analysis in analyses {
        let flag = match (analysis.bias_detected, use_colors) {
            (true, true) => "BIAS".red().bold().to_string(),
            (true, false) => "BIAS".to_string(),
            (false, true) => "ok".green().to_string(),
            (false, false) => "ok".to_string(),
        };
        lines.push(String::new());
        lines.push(format!(
            "{} [{}]  parity {:.3}  F {:.3}  p {:.4}  d {:.3}",
            analysis.attribute, flag, analysis.parity_ratio, analysis.f_stat, analysis.p_value, analysis.cohen_d
        ));
        for group in &analysis.groups {
            lines.push(format!(
                "  {:<16} n={:<5} mean {}  std {:.1}",
                truncate(&group.label, 16),
                group.count,
                format_score(group.mean),
                group.std
            ));
        }
        lines.push(format!("  {}", analysis.interpretation));
    }

    if let Some(inter) = &report.intersectional {
        lines.push(format!(
            "  most advantaged {}, most disadvantaged {}, gap {:.1}",
            inter.most_advantaged, inter.most_disadvantaged, inter.gap
        ));
    }
    if !report.skipped_attributes.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Skipped (fewer than 2 groups): {}",
            report.skipped_attributes.join(", ")
        ));
    }

    lines.push(String::new());
    lines.push("Recommendations:".to_string());
    for rec in &report.recommendations {
        lines.push(format!("  - {}", rec));
    }
    lines.join("\n")
}

/// Format a duration into a human-readable age string
/// "2h" for hours, "3d" for days, "1w" for weeks
pub fn format_age(duration: Duration) -> String {
    let hours = duration.num_hours();
    let days = duration.num_days();
    let weeks = days / 7;

    if weeks >= 1 {
        format!("{}w", weeks)
    } else if days >= 1 {
        format!("{}d", days)
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        let minutes = duration.num_minutes();
        if minutes >= 1 {
            format!("{}m", minutes)
        } else {
            "now".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{EvaluationRecord, FieldValue};
    use crate::fairness::{FairnessAuditor, ScoredSubject};
    use crate::jobs::JobOptions;
    use crate::scoring::{AnalysisMode, Evaluator, ScoringConfig};
    use chrono::Utc;

    fn sample_results() -> Vec<ResultRecord> {
        let evaluator = Evaluator::new(&ScoringConfig::default()).unwrap();
        let mut a = EvaluationRecord {
            subject_id: "E-001".to_string(),
            narrative: Some("Excellent delivery\tand\nreliable.".to_string()),
            fields: BTreeMap::new(),
            attributes: BTreeMap::new(),
        };
        a.fields.insert("kpi_score".to_string(), FieldValue::Number(91.0));
        a.attributes.insert("gender".to_string(), FieldValue::from("F"));
        let b = EvaluationRecord {
            subject_id: "E-002".to_string(),
            narrative: None,
            fields: [("award_count".to_string(), FieldValue::Number(1.0))].into(),
            attributes: BTreeMap::new(),
        };
        [a, b]
            .iter()
            .map(|r| ResultRecord::new("job-1", r, evaluator.evaluate(r, AnalysisMode::Hybrid).unwrap()))
            .collect()
    }

    #[test]
    fn test_format_results_table_empty() {
        assert_eq!(format_results_table(&[], false), "No results found.");
    }

    #[test]
    fn test_format_results_table_rows() {
        let results = sample_results();
        let table = format_results_table(&results, false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1."));
        assert!(lines[0].contains("E-001"));
        // no narrative renders a dash in the text column
        assert!(lines[1].contains("    -"));
        assert!(lines[1].contains("E-002"));
    }

    #[test]
    fn test_format_results_tsv_header_and_rows() {
        let results = sample_results();
        let tsv = format_results_tsv(&results);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 3);

        let header: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(header[0], "subject_id");
        assert!(header.contains(&"hybrid_score"));
        assert!(header.contains(&"attr.gender"));
        for line in &lines[1..] {
            assert_eq!(line.split('\t').count(), header.len());
        }
        let gender_col = header.iter().position(|h| *h == "attr.gender").unwrap();
        assert_eq!(lines[1].split('\t').nth(gender_col), Some("F"));
        assert_eq!(lines[2].split('\t').nth(gender_col), Some(""));
    }

    #[test]
    fn test_format_results_tsv_empty() {
        assert_eq!(format_results_tsv(&[]), "");
    }

    #[test]
    fn test_format_results_json_roundtrip_shape() {
        let results = sample_results();
        let json = format_results_json(&results).unwrap();
        let parsed: Vec<ResultRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, results);
    }

    #[test]
    fn test_format_job_status_failed() {
        let mut job = AnalysisJob::new(
            "job-7",
            "q3.json",
            JobOptions {
                sample_size: 10,
                mode: AnalysisMode::Hybrid,
                throttle_ms: 0,
            },
        );
        job.status = JobStatus::Failed;
        job.error = Some("Failed to load dataset 'q3.json'".to_string());

        let text = format_job_status(&job, false);
        assert!(text.starts_with("Job: job-7"));
        assert!(text.contains("Status: failed"));
        assert!(text.contains("Error: Failed to load dataset"));
        assert!(!text.contains("Average score"));
    }

    #[test]
    fn test_format_job_list() {
        assert_eq!(format_job_list(&[], false), "No completed jobs found.");

        let jobs = vec![JobSummary {
            id: "job-1".to_string(),
            dataset_ref: "q3.json".to_string(),
            status: JobStatus::Completed,
            processed_count: 3,
            total_count: 4,
            average_score: Some(72.35),
            completed_at: Some(Utc::now() - Duration::hours(5)),
        }];
        let line = format_job_list(&jobs, false);
        assert!(line.contains("job-1"));
        assert!(line.contains("completed"));
        assert!(line.contains("3/4"));
        assert!(line.contains("5h"));
    }

    #[test]
    fn test_format_fairness_report() {
        let batch: Vec<ScoredSubject> = (0..20)
            .map(|i| ScoredSubject {
                subject_id: format!("S{}", i),
                score: if i < 10 { 80.0 + (i % 2) as f64 } else { 60.0 + (i % 2) as f64 },
                attributes: [("gender".to_string(), if i < 10 { "M" } else { "F" }.to_string())].into(),
            })
            .collect();
        let report = FairnessAuditor::default().audit(&batch, &["gender".to_string(), "team".to_string()]);

        let text = format_fairness_report(&report, false);
        assert!(text.starts_with("Fairness audit: 20 results, risk"));
        assert!(text.contains("gender [BIAS]"));
        assert!(text.contains("Skipped (fewer than 2 groups): team"));
        assert!(text.contains("Recommendations:"));
    }

    #[test]
    fn test_format_fairness_report_no_data() {
        let text = format_fairness_report(&FairnessReport::no_data(), false);
        assert!(text.starts_with("No scored results"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Short", 20), "Short");
        assert_eq!(truncate("This is a very long title", 15), "This is a ve...");
        assert_eq!(truncate("Hello world", 3), "Hel");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::hours(3)), "3h");
        assert_eq!(format_age(Duration::days(2)), "2d");
        assert_eq!(format_age(Duration::weeks(2)), "2w");
        assert_eq!(format_age(Duration::minutes(30)), "30m");
        assert_eq!(format_age(Duration::seconds(30)), "now");
    }
}
