//! Entry point for the `gnis` command-line interface.
#![forbid(unsafe_code)]

fn main() {
    gnis_cli::init_logging();
    if let Err(err) = gnis_cli::run() {
        eprintln!("gnis: {err}");
        std::process::exit(1);
    }
}
