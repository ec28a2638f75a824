use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::data::snapshot::load_snapshot;
use crate::data::validate::{audit_snapshot, ValidationSeverity};
use crate::geo::bounds::bounds_report;
use crate::prepare::{prepare_from_file, prepare_snapshot, PrepareReport};
use crate::view::filter::{FilterState, SeverityFilter};
use crate::view::map::INITIAL_CAMERA;
use crate::view::state::AppState;

const USAGE: &str = "usage: crashmap <prepare|convert|check-bounds|validate|geojson|search|details|municipalities|clusters>";
const SWITCHES: [&str; 1] = ["--json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Prepare,
    Convert,
    CheckBounds,
    Validate,
    Geojson,
    Search,
    Details,
    Municipalities,
    Clusters,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("prepare") => Some(Command::Prepare),
        Some("convert") => Some(Command::Convert),
        Some("check-bounds") => Some(Command::CheckBounds),
        Some("validate") => Some(Command::Validate),
        Some("geojson") => Some(Command::Geojson),
        Some("search") => Some(Command::Search),
        Some("details") => Some(Command::Details),
        Some("municipalities") => Some(Command::Municipalities),
        Some("clusters") => Some(Command::Clusters),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };
    let rest = &args[2..];

    match command {
        Command::Prepare => run_prepare(rest),
        Command::Convert => with_options(rest, handle_convert),
        Command::CheckBounds => run_check_bounds(rest),
        Command::Validate => with_options(rest, handle_validate),
        Command::Geojson => with_options(rest, handle_geojson),
        Command::Search => with_options(rest, handle_search),
        Command::Details => with_options(rest, handle_details),
        Command::Municipalities => with_options(rest, handle_municipalities),
        Command::Clusters => with_options(rest, handle_clusters),
    }
}

/// `prepare [--url u] [--out path]`: download the sheet and write the snapshot.
pub fn run_prepare(args: &[String]) -> i32 {
    with_options(args, handle_prepare)
}

/// `check-bounds [path] [--json]`: coordinate summary of a snapshot.
pub fn run_check_bounds(args: &[String]) -> i32 {
    with_options(args, handle_check_bounds)
}

/// Positional arguments, `--name value` flags, and bare switches.
#[derive(Debug, Default)]
struct Options<'a> {
    positional: Vec<&'a str>,
    flags: BTreeMap<&'a str, &'a str>,
    switches: BTreeSet<&'a str>,
}

impl<'a> Options<'a> {
    fn parse(args: &'a [String]) -> Result<Self, String> {
        let mut options = Self::default();
        let mut iter = args.iter().map(String::as_str);
        while let Some(arg) = iter.next() {
            if SWITCHES.contains(&arg) {
                options.switches.insert(arg);
            } else if let Some(name) = arg.strip_prefix("--") {
                let Some(value) = iter.next() else {
                    return Err(format!("missing value for --{name}"));
                };
                options.flags.insert(name, value);
            } else {
                options.positional.push(arg);
            }
        }
        Ok(options)
    }

    fn flag(&self, name: &str) -> Option<&'a str> {
        self.flags.get(name).copied()
    }

    fn json(&self) -> bool {
        self.switches.contains("--json")
    }

    fn filters(&self) -> Result<FilterState, String> {
        let severity = match self.flag("severity") {
            Some(raw) => SeverityFilter::parse(raw).ok_or_else(|| {
                format!("invalid severity '{raw}' (expected all, deaths or injuries)")
            })?,
            None => SeverityFilter::All,
        };
        let filters = FilterState {
            municipality: self.flag("municipality").map(str::to_string),
            severity,
            start_date: self.flag("start").map(str::to_string),
            end_date: self.flag("end").map(str::to_string),
        };
        filters.validate().map_err(|err| err.to_string())?;
        Ok(filters)
    }
}

fn with_options(args: &[String], handler: fn(&Options<'_>, AppConfig) -> i32) -> i32 {
    let options = match Options::parse(args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            return 2;
        }
    };
    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return 1;
        }
    };
    if let Some(path) = options.flag("snapshot") {
        config.snapshot_path = PathBuf::from(path);
    }
    handler(&options, config)
}

fn handle_prepare(options: &Options<'_>, mut config: AppConfig) -> i32 {
    if let Some(url) = options.flag("url") {
        config.sheet_url = url.to_string();
    }
    if let Some(out) = options.flag("out") {
        config.snapshot_path = PathBuf::from(out);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return 1;
        }
    };

    match runtime.block_on(prepare_snapshot(&config)) {
        Ok(report) => print_prepare_report(&report, options.json()),
        Err(err) => {
            eprintln!("prepare failed: {err}");
            1
        }
    }
}

fn handle_convert(options: &Options<'_>, config: AppConfig) -> i32 {
    let Some(input) = options.positional.first() else {
        eprintln!("usage: crashmap convert <export.csv|export.xlsx> [--out snapshot.json]");
        return 2;
    };
    let output = options
        .flag("out")
        .map(PathBuf::from)
        .unwrap_or(config.snapshot_path);

    match prepare_from_file(PathBuf::from(input).as_path(), &output, &config.schema) {
        Ok(report) => print_prepare_report(&report, options.json()),
        Err(err) => {
            eprintln!("convert failed: {err}");
            1
        }
    }
}

fn print_prepare_report(report: &PrepareReport, as_json: bool) -> i32 {
    if as_json {
        return print_json(report, "prepare report");
    }
    println!(
        "Successfully converted sheet to JSON at: {}",
        report.output_path.display()
    );
    println!("Total records: {}", report.total_records);
    println!(
        "missing_coords={} positive_longitude={} deaths={} injuries={}",
        report.missing_coords, report.positive_longitude, report.with_deaths, report.with_injuries
    );
    0
}

/// Snapshot path from the first positional argument, else the configured one.
fn snapshot_path(options: &Options<'_>, config: &AppConfig) -> PathBuf {
    options
        .positional
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| config.snapshot_path.clone())
}

fn handle_check_bounds(options: &Options<'_>, config: AppConfig) -> i32 {
    let path = snapshot_path(options, &config);
    let records = match load_snapshot(&path) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let report = bounds_report(&records, &config.schema);
    if options.json() {
        return print_json(&report, "bounds report");
    }

    println!("Total records: {}", report.total);
    println!("Valid records (strict number check): {}", report.valid);
    println!("Positive longitude outliers: {}", report.outliers.len());
    for outlier in &report.outliers {
        println!(
            "- id={} longitude={} latitude={} municipality={}",
            outlier.id, outlier.longitude, outlier.latitude, outlier.municipality
        );
    }
    match report.bounds {
        Some(bounds) => println!("Bounds: {:?}", bounds.as_array()),
        None => println!("Bounds: none"),
    }
    0
}

fn handle_validate(options: &Options<'_>, config: AppConfig) -> i32 {
    let path = snapshot_path(options, &config);
    let records = match load_snapshot(&path) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let report = audit_snapshot(&records, &config.schema);
    for diagnostic in &report.diagnostics {
        eprintln!("- {diagnostic}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} error(s), {} warning(s)",
            report.count(ValidationSeverity::Error),
            report.count(ValidationSeverity::Warning)
        );
        1
    } else {
        println!(
            "validation passed: {} ({} records, {} warning(s))",
            path.display(),
            records.len(),
            report.count(ValidationSeverity::Warning)
        );
        0
    }
}

/// Load the session state and apply filter flags; usage problems map to exit 2.
fn load_state(options: &Options<'_>, config: &AppConfig) -> Result<AppState, i32> {
    let filters = options.filters().map_err(|err| {
        eprintln!("{err}");
        2
    })?;
    let mut state = AppState::load(config).map_err(|err| {
        eprintln!("{err}");
        1
    })?;
    state.set_filters(filters).map_err(|err| {
        eprintln!("{err}");
        2
    })?;
    Ok(state)
}

fn handle_geojson(options: &Options<'_>, mut config: AppConfig) -> i32 {
    if let Some(path) = options.positional.first() {
        config.snapshot_path = PathBuf::from(path);
    }
    match load_state(options, &config) {
        Ok(state) => print_json(state.visible_features(), "feature collection"),
        Err(code) => code,
    }
}

fn handle_search(options: &Options<'_>, config: AppConfig) -> i32 {
    if options.positional.is_empty() {
        eprintln!("usage: crashmap search <query> [--limit n] [--municipality m] [--severity s]");
        return 2;
    }
    let query = options.positional.join(" ");
    let limit = parse_usize_arg(options.flag("limit"), "limit", usize::MAX);

    let mut state = match load_state(options, &config) {
        Ok(state) => state,
        Err(code) => return code,
    };
    state.set_search_query(query);
    let results: Vec<_> = state.search_results().iter().take(limit).collect();
    print_json(&results, "search results")
}

fn handle_details(options: &Options<'_>, config: AppConfig) -> i32 {
    let Some(raw_key) = options.positional.first() else {
        eprintln!("usage: crashmap details <key> [--json]");
        return 2;
    };
    let Ok(key) = raw_key.parse::<usize>() else {
        eprintln!("invalid key '{raw_key}'");
        return 2;
    };

    let mut state = match AppState::load(&config) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };
    if !state.select(key) {
        eprintln!("no record with key {key}");
        return 1;
    }
    let Some(details) = state.selected_details() else {
        return 1;
    };

    if options.json() {
        return print_json(&details, "details");
    }
    print!("{}", details.render_text());
    0
}

fn handle_municipalities(options: &Options<'_>, config: AppConfig) -> i32 {
    let path = snapshot_path(options, &config);
    match load_snapshot(&path) {
        Ok(records) => {
            for name in crate::view::filter::municipalities(&records, &config.schema) {
                println!("{name}");
            }
            0
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn handle_clusters(options: &Options<'_>, config: AppConfig) -> i32 {
    let zoom = parse_f64_arg(options.flag("zoom"), "zoom", INITIAL_CAMERA.zoom);
    match load_state(options, &config) {
        Ok(state) => print_json(&state.clusters_at(zoom), "clusters"),
        Err(code) => code,
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}

fn parse_usize_arg(raw: Option<&str>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', ignoring");
            }
            default
        })
}

fn parse_f64_arg(raw: Option<&str>, name: &str, default: f64) -> f64 {
    raw.and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command(&args(&["crashmap", "check-bounds"])), Some(Command::CheckBounds));
        assert_eq!(parse_command(&args(&["crashmap", "serve"])), None);
        assert_eq!(parse_command(&args(&["crashmap"])), None);
    }

    #[test]
    fn options_split_flags_and_positionals() {
        let raw = args(&["main", "st", "--limit", "5", "--json"]);
        let options = Options::parse(&raw).unwrap();
        assert_eq!(options.positional, vec!["main", "st"]);
        assert_eq!(options.flag("limit"), Some("5"));
        assert!(options.json());

        let dangling = args(&["--zoom"]);
        assert!(Options::parse(&dangling).is_err());
    }

    #[test]
    fn filter_flags_are_validated() {
        let raw = args(&["--severity", "deaths", "--start", "2021-01-01"]);
        let filters = Options::parse(&raw).unwrap().filters().unwrap();
        assert_eq!(filters.severity, SeverityFilter::Deaths);
        assert_eq!(filters.start_date.as_deref(), Some("2021-01-01"));

        let bad = args(&["--end", "01/02/21"]);
        assert!(Options::parse(&bad).unwrap().filters().is_err());
    }
}
