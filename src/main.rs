use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use seat_analyzer::analyzer::{AdmissionAnalyzer, ComparisonAnalysis, OverallAnalysis, ProgramAnalysis};
use seat_analyzer::cache::AggregateCache;
use seat_analyzer::filter::{FilterCriteria, YearRange};
use seat_analyzer::loader::RecordLoader;
use seat_analyzer::models::{ComparisonType, Config, DataSourceMode, Dimension, Record};
use seat_analyzer::report;
use seat_analyzer::store::RecordStore;
use std::fs;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("seat-analyzer")
        .version("1.0")
        .about("Analyzes seat allocation trends across institutes and programs")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("top-n")
                .short('n')
                .long("top-n")
                .value_name("N")
                .help("Number of institutes/programs in comparison tables (0 = all)")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("compare-by")
                .long("compare-by")
                .value_name("KIND")
                .help("Compare institutes or programs")
                .value_parser(["institute", "program"]),
        )
        .arg(
            Arg::new("program")
                .long("program")
                .value_name("NAME")
                .help("Program for the program-specific analysis"),
        )
        .arg(
            Arg::new("institute")
                .long("institute")
                .value_name("NAME")
                .help("Institute for the program-specific analysis"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!("⚠️  Please edit {} and point data_file at your seat allocation CSV, then run the program again.", config_file);
        return Ok(());
    };

    if let Some(top_n) = matches.get_one::<i64>("top-n") {
        config.top_n = *top_n;
    }
    if let Some(kind) = matches.get_one::<String>("compare-by") {
        config.compare_by = kind.parse()?;
    }
    if let Some(program) = matches.get_one::<String>("program") {
        config.selected_program = Some(program.clone());
    }
    if let Some(institute) = matches.get_one::<String>("institute") {
        config.selected_institute = Some(institute.clone());
    }

    let output_dir = Path::new(config.output_directory.as_deref().unwrap_or("output")).to_path_buf();
    fs::create_dir_all(&output_dir)?;
    report::clean_output_directory(&output_dir)?;

    let records = load_records(&config).await?;
    if records.is_empty() {
        println!("❌ No usable records found, nothing to analyze");
        return Ok(());
    }

    let store = RecordStore::new(records);
    let criteria = build_criteria(&config, &store)?;

    println!("🔍 Analyzing {} seat allocation records", store.len());
    println!(
        "📅 Years: {}-{}",
        criteria.year_range.min, criteria.year_range.max
    );
    println!("🎯 Quotas: {}", join(&criteria.quotas));
    println!("👥 Genders: {}", join(&criteria.genders));
    println!("📄 Output directory: {} (cleaned)", output_dir.display());

    let cache = AggregateCache::new();
    let analyzer = AdmissionAnalyzer::new(&store, &cache);

    let filtered = analyzer.filtered_records(&criteria)?;
    println!("   ✅ {} record(s) match the filters", filtered.len());
    report::write_filtered_csv(&filtered, &output_dir)?;

    let overall = analyzer.overall_analysis(&criteria)?;

    let program = match config.selected_program.clone() {
        Some(program) => Some(program),
        None => analyzer.first_value(&criteria, Dimension::Program)?,
    };
    let institute = match config.selected_institute.clone() {
        Some(institute) => Some(institute),
        None => analyzer.first_value(&criteria, Dimension::Institute)?,
    };
    let program_view = analyzer.program_analysis(
        &criteria,
        program.as_deref().unwrap_or_default(),
        institute.as_deref().unwrap_or_default(),
    )?;

    let comparison = analyzer.comparison_analysis(&criteria, config.compare_by, config.top_n)?;

    report::write_overall_reports(&overall, &output_dir)?;
    report::write_program_reports(&program_view, &output_dir)?;
    report::write_comparison_reports(&comparison, &output_dir)?;
    let summary = report::render_summary(&overall, &program_view, &comparison);
    report::write_summary(&summary, &output_dir)?;

    let stats = cache.stats();
    log::debug!(
        "derived table cache: {} hit(s), {} miss(es), {} entries",
        stats.hits,
        stats.misses,
        stats.entries
    );

    print_summary(&overall, &program_view, &comparison);

    println!("\n✅ Analysis complete!");
    println!("📂 Results: {}", output_dir.display());
    Ok(())
}

async fn load_records(config: &Config) -> Result<Vec<Record>> {
    let loader = RecordLoader::new();

    let (records, load_report) = match config.data_source_mode {
        DataSourceMode::Local => {
            let data_file = config
                .data_file
                .as_deref()
                .unwrap_or("data/JEE_Rank_2016_2024.csv");
            println!("📂 Reading seat allocation data from: {}", data_file);
            loader.load_file(data_file)?
        }
        DataSourceMode::Internet => {
            let url = config
                .data_url
                .as_deref()
                .context("data_source_mode is \"internet\" but data_url is not set")?;
            println!("🌐 Fetching seat allocation data from: {}", url);
            loader.load_url(url).await?
        }
    };

    println!(
        "   ✅ Loaded {} record(s), skipped {} incomplete row(s)",
        records.len(),
        load_report.rows_skipped
    );
    if load_report.missing_closing_rank > 0 {
        println!(
            "   ℹ️  {} record(s) have no closing rank and are left out of rank averages",
            load_report.missing_closing_rank
        );
    }
    Ok(records)
}

/// Config overrides on top of the store's full-range defaults.
fn build_criteria(config: &Config, store: &RecordStore) -> Result<FilterCriteria> {
    let mut criteria = store.default_criteria()?;

    if let Some([min, max]) = config.filter.year_range {
        criteria.year_range = YearRange::new(min, max);
    }
    if let Some(quotas) = &config.filter.quotas {
        criteria.quotas = quotas.iter().cloned().collect();
    }
    if let Some(genders) = &config.filter.genders {
        criteria.genders = genders.iter().cloned().collect();
    }

    criteria.validate()?;
    Ok(criteria)
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_summary(overall: &OverallAnalysis, program: &ProgramAnalysis, comparison: &ComparisonAnalysis) {
    println!("\n📊 SUMMARY");
    println!("==========\n");

    println!("🏛️  Seat distribution (most entries first):");
    for (i, row) in overall.seat_distribution.rows.iter().rev().take(5).enumerate() {
        println!(
            "   {}. {} - {} seat entries",
            i + 1,
            row.key_label(),
            row.metric(seat_analyzer::analyzer::SEATS).flatten().unwrap_or(0.0)
        );
    }

    match &overall.seat_intake_trend {
        Ok(fit) => println!("\n📈 Seat intake trend: {:+.1} entries per year", fit.model.slope),
        Err(err) => println!("\n📈 Seat intake trend: not available ({})", err),
    }

    println!("\n🎓 {} at {}:", program.program, program.institute);
    if !program.has_data() {
        println!("   ❓ No data available for the selected program and institute combination");
    } else {
        match &program.closing_rank_trend {
            Ok(fit) => println!("   Closing rank moves {:+.1} per year", fit.model.slope),
            Err(err) => println!("   Closing rank trend not available ({})", err),
        }
    }

    let noun = match comparison.compare_by {
        ComparisonType::Institute => "institutes",
        ComparisonType::Program => "programs",
    };
    println!("\n🏆 Top {} by average closing rank:", noun);
    for (i, row) in comparison.by_closing_rank.rows.iter().enumerate() {
        let avg = row
            .metric(seat_analyzer::analyzer::AVG_CLOSING_RANK)
            .flatten()
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "n/a".to_string());
        println!("   {}. {} - {}", i + 1, row.key_label(), avg);
    }
}
