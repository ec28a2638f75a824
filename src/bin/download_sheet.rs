//! Download the crash sheet export and write the snapshot.
//! Run: cargo run --bin download_sheet -- [--url <csv export>] [--out assets/data.json]

fn main() {
    crashmap::logging::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(crashmap::cli::run_prepare(&args));
}
