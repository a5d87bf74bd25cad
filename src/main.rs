use std::process::ExitCode;

use rabbitmq_dump_queue::{app, config::Config, logging::init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::load();
    init_tracing(config.verbose, config.log_format);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match app::run(&config, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
