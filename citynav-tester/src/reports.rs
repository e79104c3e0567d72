//! Report generation for benchmark runs: console, JSON, and markdown.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use crate::runner::TaskRecord;

pub fn generate_console_report(
    out: &mut dyn Write,
    records: &[TaskRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Benchmark Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "============================".cyan())?;

    let total = records.len();
    let passed = records.iter().filter(|r| r.passed).count();
    let failed = total - passed;

    writeln!(out, "Total tasks: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", failed.to_string().red())?;
    #[allow(clippy::cast_precision_loss)]
    let success_rate = (passed as f64 / total as f64) * 100.0;
    writeln!(out, "Success rate: {success_rate:.1}%")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for record in records {
        let status = if record.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {}", status, record.session_id.bold())?;
        writeln!(
            out,
            "   Raw score: {:.1}  Weighted: {:.1}  Deviation: {:.1} m",
            record.raw_score, record.score, record.avg_deviation_m
        )?;
        writeln!(
            out,
            "   Commands: {}  Stop: {}",
            record.commands_issued,
            record.stop_reason.as_deref().unwrap_or("-")
        )?;
        if !record.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &record.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let weighted_total: f64 = records.iter().map(|r| r.score).sum();
    writeln!(out, "{}", "🏆 Weighted Score".bright_yellow().bold())?;
    writeln!(out, "{}", "=================".yellow())?;
    writeln!(out, "Sum over all tasks: {weighted_total:.1}")?;
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, records: &[TaskRecord]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(records)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, records: &[TaskRecord]) -> Result<()> {
    writeln!(out, "# CityNav Benchmark Results\n")?;

    let total = records.len();
    let passed = records.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total tasks**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    #[allow(clippy::cast_precision_loss)]
    let success_rate = (passed as f64 / total as f64) * 100.0;
    writeln!(out, "- **Success rate**: {success_rate:.1}%\n")?;

    writeln!(out, "## Tasks\n")?;
    writeln!(
        out,
        "| Level | Policy | Raw | Weighted | Reached | Deviation (m) | Commands | Result |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|")?;
    for record in records {
        writeln!(
            out,
            "| {} | {} | {:.1} | {:.1} | {} | {:.1} | {} | {} |",
            record.level,
            record.policy,
            record.raw_score,
            record.score,
            if record.destination_reached { "yes" } else { "no" },
            record.avg_deviation_m,
            record.commands_issued,
            if record.passed { "✅" } else { "❌" }
        )?;
    }
    writeln!(out)?;

    let failing: Vec<_> = records.iter().filter(|r| !r.passed).collect();
    if !failing.is_empty() {
        writeln!(out, "## Failures\n")?;
        for record in failing {
            writeln!(out, "### {}\n", record.session_id)?;
            for failure in &record.failures {
                writeln!(out, "- {failure}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(passed: bool) -> TaskRecord {
        TaskRecord {
            session_id: "follow-route-L1".to_string(),
            level: 1,
            policy: "follow-route".to_string(),
            commands_issued: 20,
            stop_reason: Some("Agent requested finish".to_string()),
            score: 97.5,
            raw_score: 97.5,
            destination_reached: true,
            distance_to_target_m: 8.2,
            avg_deviation_m: 2.1,
            passed,
            failures: if passed {
                Vec::new()
            } else {
                vec!["expected raw score >= 80, got 42.0".to_string()]
            },
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn console_report_lists_every_task() {
        let mut buffer = Vec::new();
        let records = [sample_record(true), sample_record(false)];
        generate_console_report(&mut buffer, &records, Duration::from_secs(1)).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Total tasks: 2"));
        assert!(text.contains("follow-route-L1"));
        assert!(text.contains("expected raw score >= 80"));
        assert!(text.contains("Weighted Score"));
    }

    #[test]
    fn json_report_is_parseable() {
        let mut buffer = Vec::new();
        generate_json_report(&mut buffer, &[sample_record(true)]).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed[0]["policy"], "follow-route");
        assert_eq!(parsed[0]["passed"], true);
    }

    #[test]
    fn markdown_report_has_a_task_table() {
        let mut buffer = Vec::new();
        generate_markdown_report(&mut buffer, &[sample_record(false)]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# CityNav Benchmark Results"));
        assert!(text.contains("| 1 | follow-route |"));
        assert!(text.contains("## Failures"));
    }
}
