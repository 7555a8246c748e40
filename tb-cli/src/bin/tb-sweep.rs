use std::process::ExitCode;

fn main() -> ExitCode {
    tb_cli::sweep::main()
}
