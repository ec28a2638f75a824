//! Report coordinate coverage, positive-longitude outliers and bounds of a snapshot.
//! Run: cargo run --bin check_bounds -- [assets/data.json] [--json]

fn main() {
    crashmap::logging::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(crashmap::cli::run_check_bounds(&args));
}
