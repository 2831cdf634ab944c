fn main() {
    let command_line_interface = schema_ts::cli::CommandLineInterface::load();
    let code = schema_ts::cli::run_to_exit_code(&command_line_interface);
    std::process::exit(code);
}
