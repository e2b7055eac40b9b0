use std::process::ExitCode;

use s3smoke::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    cli::init_logging(&cli.log_level);

    // The checklist is strictly sequential: current_thread is sufficient
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            println!("Test failed: could not start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if runtime.block_on(cli::execute(&cli, &mut out)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
