//! syncv3-migrate - move a device off the sliding-sync proxy.
//!
//! Deletes the proxy's sync loop for the device behind an access token and
//! writes its undelivered to-device messages into an Element Desktop console
//! script.

use clap::error::ErrorKind as ClapErrorKind;

use sliding_sync_migrate::{error, output, pipeline, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    output::init_colors();

    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) if matches!(
            e.kind(),
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
        ) =>
        {
            e.exit()
        }
        Err(e) => {
            // Unusable command lines share the missing-input exit code.
            error::print_usage_error(&e);
            std::process::exit(error::EXIT_USAGE);
        }
    };

    output::init_tracing(&cli.log_level);

    if let Err(e) = pipeline::run_cli(cli).await {
        error::report_failure(&e);
        std::process::exit(e.exit_code());
    }
}
