fn main() {
    // Logging is initialised inside `process_cli` once `--log-level` is known.
    let code = siterm_config_fetcher::cli::process_cli();
    log::logger().flush();
    std::process::exit(code);
}
