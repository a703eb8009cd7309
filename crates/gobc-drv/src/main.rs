//! gobc - Gob compiler command line.

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let code = gobc_drv::run(std::env::args().skip(1));
    std::process::exit(code);
}
