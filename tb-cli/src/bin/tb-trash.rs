use std::process::ExitCode;

fn main() -> ExitCode {
    tb_cli::trash::main()
}
