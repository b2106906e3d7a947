use scedel::cli::CommandLineInterface;
use std::process::ExitCode;

fn main() -> ExitCode {
    CommandLineInterface::load().run()
}
