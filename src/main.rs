use hearthview::cli::CliArgs;
use hearthview::run_with_args;

fn main() {
    let args = match CliArgs::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run_with_args(args) {
        eprintln!("Application error: {err:?}");
    }
}
