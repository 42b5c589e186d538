pub mod downloader;
mod cli;

pub use cli::init_tracing;

/// Parse arguments, run the pipeline, map the result to an exit code
pub fn run() -> std::process::ExitCode {
    cli::main()
}
