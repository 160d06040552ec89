//! Output formatting module

use serde::Serialize;

use fleet_app::app::{DriverReport, LeaderboardEntry, LeaderboardOrder, PipelineStats, ViolationHistory};
use fleet_types::{DeadLetter, OutputFormat, Result, TelemetryReading, ViolationEvent};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    println!("{}", content);
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestSummary<'a> {
    #[serde(flatten)]
    stats: &'a PipelineStats,
    rejected: usize,
    dry_run: bool,
}

pub fn output_ingest(
    output_format: OutputFormat,
    stats: &PipelineStats,
    rejected: usize,
    dry_run: bool,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(&IngestSummary {
            stats,
            rejected,
            dry_run,
        });
    }

    println!("\nIngest Summary{}", if dry_run { " (dry run)" } else { "" });
    println!("==============");
    println!("Readings processed:  {}", stats.readings_processed);
    println!("Readings rejected:   {}", rejected);
    println!("Events detected:     {}", stats.events_detected);
    println!("Violations recorded: {}", stats.violations_recorded);
    println!("Duplicates skipped:  {}", stats.duplicates);
    println!("Scores updated:      {}", stats.scores_updated);
    println!("Dead-lettered:       {}", stats.dead_lettered);
    if stats.dead_lettered > 0 {
        println!("\nInspect failures with: fleet-scoring dead-letters");
    }
    Ok(())
}

pub fn output_evaluation(
    output_format: OutputFormat,
    results: &[(TelemetryReading, Vec<ViolationEvent>)],
) -> Result<()> {
    if output_format == OutputFormat::Json {
        let events: Vec<&ViolationEvent> = results.iter().flat_map(|(_, e)| e).collect();
        return print_json(&events);
    }

    let mut total = 0;
    for (reading, events) in results {
        if events.is_empty() {
            continue;
        }
        println!(
            "{} / {} at {}",
            reading.truck_id,
            reading.driver_id,
            reading.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        for event in events {
            println!(
                "  {:<18} {:<9} {}",
                event.violation_type.code(),
                event.severity.code(),
                event.message
            );
        }
        total += events.len();
    }

    println!();
    println!("{} readings, {} violations", results.len(), total);
    Ok(())
}

pub fn output_report(output_format: OutputFormat, report: &DriverReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(report);
    }

    let score = &report.score;
    println!("\nDriver Score: {}", score.driver_id);
    println!("==============");
    println!("Score:            {} ({})", score.current_score, score.score_category);
    println!(
        "Violations:       {} in last {} days",
        report.window_violations, report.window_days
    );
    println!(
        "Last violation:   {}",
        score
            .last_violation_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Updated:          {}", score.updated_at.format("%Y-%m-%d %H:%M:%S"));

    let b = &report.breakdown;
    println!("\n--- Breakdown ---");
    println!("Speeding:          {}", b.speeding);
    println!("Low tire pressure: {}", b.low_tire_pressure);
    println!("Low fuel:          {}", b.low_fuel);
    println!("High temp:         {}", b.high_temp);
    if b.other > 0 {
        println!("Other:             {}", b.other);
    }
    println!("-----------------");
    println!("Recommended action: {}", score.score_category.recommended_action());
    Ok(())
}

pub fn output_history(output_format: OutputFormat, history: &ViolationHistory) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(history);
    }

    println!("Violation History: {}", history.driver_id);
    println!("==================");
    println!("Last {} days: {} violations", history.days, history.total);
    println!();

    if history.violations.is_empty() {
        println!("No violations found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<18} {:<9} {:>6}  {}",
        "Date", "Type", "Severity", "Points", "Message"
    );
    println!("{}", "-".repeat(90));
    for v in &history.violations {
        println!(
            "{:<12} {:<18} {:<9} {:>6}  {}",
            v.recorded_at.format("%m/%d %H:%M"),
            v.violation_type.code(),
            v.severity.code(),
            format!("-{}", v.points_deducted),
            truncate(&v.message, 40)
        );
    }
    Ok(())
}

pub fn output_leaderboard(
    output_format: OutputFormat,
    entries: &[LeaderboardEntry],
    order: LeaderboardOrder,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(entries);
    }

    match order {
        LeaderboardOrder::Top => println!("Top Drivers"),
        LeaderboardOrder::Bottom => println!("Drivers Needing Attention"),
    }
    println!("=========================");

    if entries.is_empty() {
        println!("No scored drivers yet.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<16} {:>5}  {:<10} {:>10}",
        "Rank", "Driver", "Score", "Category", "Violations"
    );
    println!("{}", "-".repeat(51));
    for entry in entries {
        println!(
            "{:>4}  {:<16} {:>5}  {:<10} {:>10}",
            entry.rank,
            truncate(&entry.driver_id, 16),
            entry.current_score,
            entry.score_category.label(),
            entry.window_violations
        );
        if let Some(ref action) = entry.recommended_action {
            println!("      -> {}", action);
        }
    }
    Ok(())
}

pub fn output_dead_letters(output_format: OutputFormat, letters: &[DeadLetter]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(letters);
    }

    println!("Dead Letters");
    println!("============");
    println!("Total: {}", letters.len());
    println!();

    if letters.is_empty() {
        println!("Nothing failed.");
        return Ok(());
    }

    println!(
        "{:<12} {:<16} {:<16} {:>8}  {}",
        "Failed", "Stage", "Driver", "Attempts", "Error"
    );
    println!("{}", "-".repeat(90));
    for letter in letters {
        println!(
            "{:<12} {:<16} {:<16} {:>8}  {}",
            letter.failed_at.format("%m/%d %H:%M"),
            format!("{:?}", letter.stage),
            truncate(&letter.driver_id, 16),
            letter.attempts,
            truncate(&letter.error, 40)
        );
    }
    Ok(())
}
