fn main() -> std::process::ExitCode {
    reel_fetch_lib::run()
}
