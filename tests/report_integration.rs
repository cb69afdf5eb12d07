use seat_analyzer::analyzer::AdmissionAnalyzer;
use seat_analyzer::cache::AggregateCache;
use seat_analyzer::loader::RecordLoader;
use seat_analyzer::models::{ComparisonType, Config};
use seat_analyzer::report;
use seat_analyzer::store::RecordStore;
use std::fs;
use tempfile::TempDir;

const DATA: &str = "\
Institute,Academic_Program_Name,Quota,Seat_Type,Gender,Opening_Rank,Closing_Rank,Year
IIT Kanpur,Electrical Engineering,AI,OPEN,Gender-Neutral,400,900,2019
IIT Kanpur,Electrical Engineering,AI,OPEN,Female-only,1200,2100,2019
IIT Kanpur,Electrical Engineering,AI,OPEN,Gender-Neutral,380,860,2020
IIT Kanpur,Electrical Engineering,AI,OPEN,Gender-Neutral,350,820,2021
IIT Guwahati,Electrical Engineering,AI,OPEN,Gender-Neutral,1800,2600,2020
IIT Guwahati,Mathematics and Computing,AI,OPEN,Gender-Neutral,1500,,2021
NIT Surathkal,Electrical Engineering,OS,OPEN,Gender-Neutral,5000,7000,2021
";

fn write_data(dir: &TempDir) -> String {
    let path = dir.path().join("seats.csv");
    fs::write(&path, DATA).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn full_run_writes_every_report() {
    let temp_dir = TempDir::new().unwrap();
    let data_file = write_data(&temp_dir);
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&output_dir).unwrap();

    let (records, load_report) = RecordLoader::new().load_file(&data_file).unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(load_report.missing_closing_rank, 1);

    let store = RecordStore::new(records);
    let cache = AggregateCache::new();
    let analyzer = AdmissionAnalyzer::new(&store, &cache);

    let mut criteria = store.default_criteria().unwrap();
    criteria.quotas = ["AI".to_string()].into_iter().collect();

    let filtered = analyzer.filtered_records(&criteria).unwrap();
    assert_eq!(filtered.len(), 6);
    report::write_filtered_csv(&filtered, &output_dir).unwrap();

    let overall = analyzer.overall_analysis(&criteria).unwrap();
    let program = analyzer
        .program_analysis(&criteria, "Electrical Engineering", "IIT Kanpur")
        .unwrap();
    let comparison = analyzer
        .comparison_analysis(&criteria, ComparisonType::Institute, 5)
        .unwrap();

    report::write_overall_reports(&overall, &output_dir).unwrap();
    report::write_program_reports(&program, &output_dir).unwrap();
    report::write_comparison_reports(&comparison, &output_dir).unwrap();
    let summary = report::render_summary(&overall, &program, &comparison);
    report::write_summary(&summary, &output_dir).unwrap();

    for name in [
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
    ] {
        assert!(output_dir.join(name).is_file(), "missing report {}", name);
    }

    let top = fs::read_to_string(output_dir.join("top_by_closing_rank.csv")).unwrap();
    let mut lines = top.lines();
    assert_eq!(lines.next(), Some("institute,avg_opening_rank,avg_closing_rank"));
    assert_eq!(lines.next(), Some("IIT Kanpur,582.5,1170"));
    assert_eq!(lines.next(), Some("IIT Guwahati,1650,2600"));

    let opening_trend = fs::read_to_string(output_dir.join("program_opening_rank_trend.csv")).unwrap();
    let mut lines = opening_trend.lines();
    assert_eq!(lines.next(), Some("year,observed,predicted"));
    assert!(lines.next().unwrap().starts_with("2019,800,"));
    assert_eq!(lines.count(), 2);

    assert!(summary.contains("Electrical Engineering at IIT Kanpur"));
    assert!(summary.contains("Top 5 Institutes by average closing rank"));

    // Cleaning removes everything a run produced
    report::clean_output_directory(&output_dir).unwrap();
    assert_eq!(fs::read_dir(&output_dir).unwrap().count(), 0);
}

#[test]
fn exported_subset_loads_back_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let data_file = write_data(&temp_dir);
    let loader = RecordLoader::new();

    let (records, _) = loader.load_file(&data_file).unwrap();
    let store = RecordStore::new(records);
    let cache = AggregateCache::new();
    let analyzer = AdmissionAnalyzer::new(&store, &cache);
    let criteria = store.default_criteria().unwrap().with_institute("IIT Guwahati");

    let filtered = analyzer.filtered_records(&criteria).unwrap();
    let path = report::write_filtered_csv(&filtered, temp_dir.path()).unwrap();

    let (reloaded, report) = loader.load_file(&path.to_string_lossy()).unwrap();
    assert_eq!(report.rows_skipped, 0);
    let expected: Vec<_> = filtered.into_iter().cloned().collect();
    assert_eq!(reloaded, expected);
}

#[test]
fn config_round_trips_through_a_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    let path = path.to_string_lossy();

    let mut config = Config::default();
    config.top_n = 10;
    config.compare_by = ComparisonType::Program;
    config.selected_institute = Some("IIT Kanpur".to_string());
    config.filter.quotas = Some(vec!["AI".to_string(), "OS".to_string()]);
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_data_file_is_reported() {
    let err = RecordLoader::new()
        .load_file("/definitely/not/here.csv")
        .unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.csv"));
}
