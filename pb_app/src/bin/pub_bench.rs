use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use pb_bench::CliAction;
use pb_bench::config;
use pb_bench::coordinator;
use pb_bus::MemoryBus;
use pb_bus::TcpConnector;
use pb_bus::addresses;
use tracing::info;
use tracing::warn;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keep the guard alive so buffered log output reaches the file
    let _guard = pb_app::tracing_setup::init("pub_bench", "./logs", tracing::Level::INFO);

    let config = match pb_bench::parse_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            println!("{}", config::usage());
            return Ok(());
        }
        Err(err) => {
            eprintln!("pub-bench: {err}");
            eprintln!("{}", config::usage());
            std::process::exit(2);
        }
    };

    println!("Packet size: {} bytes", config.message_size);
    println!("Sending {} messages...", config.total_messages);

    let running = Arc::new(AtomicBool::new(true));
    pb_app::shutdown::setup(Arc::clone(&running))?;

    let summary = if config.endpoint.starts_with(addresses::INPROC_PREFIX) {
        info!(endpoint = %config.endpoint, "running against the in-process bus");
        coordinator::run(&config, &MemoryBus::new(), &running)?
    } else {
        let addr = config.endpoint.strip_prefix(addresses::TCP_PREFIX).unwrap_or(&config.endpoint).to_string();
        info!(endpoint = %addr, "running against external broker");
        coordinator::run(&config, &TcpConnector::new(addr), &running)?
    };

    if summary.aborted {
        warn!("run ended via EXIT broadcast");
    }
    info!(roles = summary.results.len(), aborted = summary.aborted, "run finished");

    Ok(())
}
