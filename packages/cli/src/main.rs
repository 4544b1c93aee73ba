use std::io;
use std::sync::Arc;

use clap::Parser;
use sasldb_cli::{convert, Args, Config, ASSUME_YES_ENV};
use sasldb_migrate::CancelFlag;
use signal_hook::consts::{SIGINT, SIGTERM};

fn main() {
    let args = Args::parse();
    let assume_yes = std::env::var(ASSUME_YES_ENV).ok();
    let config = Config::from_args(args, assume_yes.as_deref());

    // RUST_LOG, when set, wins over -v
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    // First signal stops the walk at the next record; a second one exits.
    let cancel = CancelFlag::new();
    for signal in [SIGINT, SIGTERM] {
        let registered = signal_hook::flag::register_conditional_shutdown(
            signal,
            1,
            Arc::clone(cancel.as_atomic()),
        )
        .and_then(|_| signal_hook::flag::register(signal, Arc::clone(cancel.as_atomic())));
        if let Err(e) = registered {
            log::warn!("cannot install handler for signal {}: {}", signal, e);
        }
    }

    let stdin = io::stdin();
    let result = convert(
        &config,
        &cancel,
        &mut stdin.lock(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );

    if let Err(e) = result {
        eprintln!("sasldb-convert: {}", e);
        std::process::exit(1);
    }
}
