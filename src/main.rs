use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use newsdesk::cli;
use newsdesk::config::ClientConfig;

fn main() {
    // Init logging; the terminal output is the product, so keep the default quiet
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = std::env::args().collect();
    let program = if args.is_empty() { "newsdesk".to_string() } else { args.remove(0) };

    let cfg = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {:#}", e);
            std::process::exit(2);
        }
    };
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "newsdesk::cli",
        "newsdesk starting: RUST_LOG='{}', api='{}', page_size={}, personalization={}, session_file='{}'",
        rust_log, cfg.base_url, cfg.page_size, cfg.personalization, cfg.session_file.display()
    );

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let code = rt.block_on(cli::run(&program, args, cfg));
    std::process::exit(code);
}
