use tracing_subscriber::EnvFilter;

use twon::cli;
use twon::config::Config;
use twon::script::Interpreter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("twon: {e}");
            eprintln!("{}", cli::usage());
            std::process::exit(1);
        }
    };

    let (config, errors) = Config::from_env();
    for e in &errors {
        tracing::warn!("ignoring {e}");
    }

    let mut interp = Interpreter::with_config(config);
    if let Err(e) = interp.run_file(&args.source) {
        eprintln!("twon: {e}");
        std::process::exit(1);
    }
}
