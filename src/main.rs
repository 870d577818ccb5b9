//! ideaforge CLI binary
//!
//! Minimal entrypoint; all logic lives in the library's `cli` module.

fn main() {
    if let Err(error) = ideaforge::cli::run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
