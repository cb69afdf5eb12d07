use crate::aggregate::AggregateRow;
use crate::analyzer::{ComparisonAnalysis, OverallAnalysis, ProgramAnalysis};
use crate::error::EngineError;
use crate::loader::COLUMNS;
use crate::models::{ComparisonType, Record};
use crate::ranking::RankedTable;
use crate::trend::TrendFit;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::path::{Path, PathBuf};

const REPORT_FILES: [&str; 15] = [
    "filtered_data.csv",
    "programs_per_institute.csv",
    "seat_distribution.csv",
    "gender_distribution.csv",
    "seat_intake_by_year.csv",
    "seat_intake_trend.csv",
    "avg_closing_rank_by_year.csv",
    "avg_closing_rank_by_seat_type.csv",
    "program_opening_rank.csv",
    "program_closing_rank.csv",
    "program_opening_rank_trend.csv",
    "program_closing_rank_trend.csv",
    "top_by_opening_rank.csv",
    "top_by_closing_rank.csv",
    "summary.txt",
];

/// Remove report files from a previous run.
pub fn clean_output_directory(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }

    for item in &REPORT_FILES {
        let item_path = output_dir.join(item);
        if item_path.is_file() {
            fs::remove_file(&item_path)
                .with_context(|| format!("Failed to remove {}", item_path.display()))?;
            log::debug!("removed previous report {}", item);
        }
    }
    Ok(())
}

/// Dump the filtered subset with the same columns the loader reads.
pub fn write_filtered_csv(records: &[&Record], output_dir: &Path) -> Result<PathBuf> {
    let csv_path = output_dir.join("filtered_data.csv");
    let mut writer = Writer::from_path(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record(&[
            record.institute.clone(),
            record.academic_program_name.clone(),
            record.quota.clone(),
            record.seat_type.clone(),
            record.gender.clone(),
            format_value(record.opening_rank),
            format_value(record.closing_rank),
            record.year.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(csv_path)
}

/// Key columns followed by one column per metric. Undefined metrics are blank.
pub fn write_table_csv(rows: &[AggregateRow], key_columns: &[&str], csv_path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    let mut header: Vec<String> = key_columns.iter().map(|c| c.to_string()).collect();
    if let Some(first) = rows.first() {
        header.extend(first.metrics.iter().map(|m| m.name.clone()));
    }
    writer.write_record(&header)?;

    for row in rows {
        let mut fields: Vec<String> = row.key.iter().map(ToString::to_string).collect();
        fields.extend(row.metrics.iter().map(|m| format_value(m.value)));
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_trend_csv(fit: &TrendFit, csv_path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    writer.write_record(["year", "observed", "predicted"])?;
    for (observed, predicted) in fit.series.observed.iter().zip(&fit.series.predicted) {
        writer.write_record(&[
            observed.year.to_string(),
            observed.value.to_string(),
            predicted.value.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_overall_reports(analysis: &OverallAnalysis, output_dir: &Path) -> Result<()> {
    write_table_csv(
        &analysis.programs_per_institute.rows,
        &["institute"],
        &output_dir.join("programs_per_institute.csv"),
    )?;
    write_table_csv(
        &analysis.seat_distribution.rows,
        &["institute"],
        &output_dir.join("seat_distribution.csv"),
    )?;
    write_table_csv(
        &analysis.gender_distribution.rows,
        &["gender"],
        &output_dir.join("gender_distribution.csv"),
    )?;
    write_table_csv(
        &analysis.seat_intake_by_year,
        &["year"],
        &output_dir.join("seat_intake_by_year.csv"),
    )?;
    if let Ok(fit) = &analysis.seat_intake_trend {
        write_trend_csv(fit, &output_dir.join("seat_intake_trend.csv"))?;
    }
    write_table_csv(
        &analysis.avg_closing_rank_by_year,
        &["year"],
        &output_dir.join("avg_closing_rank_by_year.csv"),
    )?;
    write_table_csv(
        &analysis.avg_closing_rank_by_seat_type.rows,
        &["seat_type"],
        &output_dir.join("avg_closing_rank_by_seat_type.csv"),
    )?;
    Ok(())
}

pub fn write_program_reports(analysis: &ProgramAnalysis, output_dir: &Path) -> Result<()> {
    if !analysis.has_data() {
        return Ok(());
    }
    write_table_csv(
        &analysis.opening_rank_by_year,
        &["year"],
        &output_dir.join("program_opening_rank.csv"),
    )?;
    write_table_csv(
        &analysis.closing_rank_by_year,
        &["year"],
        &output_dir.join("program_closing_rank.csv"),
    )?;
    if let Ok(fit) = &analysis.opening_rank_trend {
        write_trend_csv(fit, &output_dir.join("program_opening_rank_trend.csv"))?;
    }
    if let Ok(fit) = &analysis.closing_rank_trend {
        write_trend_csv(fit, &output_dir.join("program_closing_rank_trend.csv"))?;
    }
    Ok(())
}

pub fn write_comparison_reports(analysis: &ComparisonAnalysis, output_dir: &Path) -> Result<()> {
    let key = comparison_column(analysis.compare_by);
    write_table_csv(
        &analysis.by_opening_rank.rows,
        &[key],
        &output_dir.join("top_by_opening_rank.csv"),
    )?;
    write_table_csv(
        &analysis.by_closing_rank.rows,
        &[key],
        &output_dir.join("top_by_closing_rank.csv"),
    )?;
    Ok(())
}

pub fn write_summary(content: &str, output_dir: &Path) -> Result<()> {
    let path = output_dir.join("summary.txt");
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Plain-text digest of all three views.
pub fn render_summary(
    overall: &OverallAnalysis,
    program: &ProgramAnalysis,
    comparison: &ComparisonAnalysis,
) -> String {
    let mut content = String::new();
    content.push_str("Seat Allocation Analysis\n");
    content.push_str("========================\n\n");

    content.push_str("Overall Analysis\n");
    content.push_str("----------------\n");
    push_ranked(&mut content, "Number of programs per institute", &overall.programs_per_institute);
    push_ranked(&mut content, "Seat distribution among institutes", &overall.seat_distribution);
    push_ranked(&mut content, "Gender distribution", &overall.gender_distribution);
    push_rows(&mut content, "Seat intake by year", &overall.seat_intake_by_year);
    push_trend(&mut content, "Seat intake trend", &overall.seat_intake_trend);
    push_rows(&mut content, "Average closing rank by year", &overall.avg_closing_rank_by_year);
    push_ranked(
        &mut content,
        "Average closing rank by seat type",
        &overall.avg_closing_rank_by_seat_type,
    );

    content.push_str("Program-Specific Analysis\n");
    content.push_str("-------------------------\n");
    if program.has_data() {
        let heading = format!("{} at {}", program.program, program.institute);
        push_rows(&mut content, &format!("Opening rank for {}", heading), &program.opening_rank_by_year);
        push_trend(&mut content, "Opening rank trend", &program.opening_rank_trend);
        push_rows(&mut content, &format!("Closing rank for {}", heading), &program.closing_rank_by_year);
        push_trend(&mut content, "Closing rank trend", &program.closing_rank_trend);
    } else {
        content.push_str(&format!(
            "No data available for {} at {}.\n\n",
            program.program, program.institute
        ));
    }

    let noun = match comparison.compare_by {
        ComparisonType::Institute => "Institutes",
        ComparisonType::Program => "Programs",
    };
    content.push_str(&format!("Multiple {} Comparison\n", noun));
    content.push_str("----------------------------\n");
    push_ranked(
        &mut content,
        &format!("Top {} {} by average opening rank", comparison.top_n, noun),
        &comparison.by_opening_rank,
    );
    push_ranked(
        &mut content,
        &format!("Top {} {} by average closing rank", comparison.top_n, noun),
        &comparison.by_closing_rank,
    );

    content
}

fn push_ranked(content: &mut String, title: &str, table: &RankedTable) {
    push_rows(content, title, &table.rows);
}

fn push_rows(content: &mut String, title: &str, rows: &[AggregateRow]) {
    content.push_str(&format!("### {}\n", title));
    if rows.is_empty() {
        content.push_str("   (no matching records)\n\n");
        return;
    }
    for row in rows {
        let metrics: Vec<String> = row
            .metrics
            .iter()
            .map(|m| format!("{}: {}", m.name, display_value(m.value)))
            .collect();
        content.push_str(&format!("   {} - {}\n", row.key_label(), metrics.join(", ")));
    }
    content.push('\n');
}

fn push_trend(content: &mut String, title: &str, fit: &Result<TrendFit, EngineError>) {
    match fit {
        Ok(fit) => content.push_str(&format!(
            "### {}\n   slope {:.2} per year, intercept {:.2}\n\n",
            title, fit.model.slope, fit.model.intercept
        )),
        Err(err) => content.push_str(&format!("### {}\n   not available: {}\n\n", title, err)),
    }
}

fn comparison_column(compare_by: ComparisonType) -> &'static str {
    match compare_by {
        ComparisonType::Institute => "institute",
        ComparisonType::Program => "academic_program_name",
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn display_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v),
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}
