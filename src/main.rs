use std::process::ExitCode;

fn main() -> ExitCode {
    snapstitch_lib::run()
}
