use clap::Parser as ClapParser;
use htqq::cli::{self, CliError, ExtractOptions};
use htqq::diagnostics::StderrReporter;
use log::debug;
use std::io;

#[derive(ClapParser)]
#[command(name = "htqq")]
#[command(about = "htqq - extract text, markup and JSON records from HTML with XPath and CSS")]
#[command(version)]
#[command(after_long_help = cli::query_syntax())]
struct Cli {
    /// Query tokens: selectors, optionally split into fields with `name:` or `name::`
    query: Vec<String>,

    /// Treat every input line as a separate document
    #[arg(short, long, conflicts_with = "jsonl")]
    lines: bool,

    /// Read JSON lines and take the HTML from COLUMN; other keys are kept under "_"
    #[arg(long, value_name = "COLUMN")]
    jsonl: Option<String>,

    /// Print bare values as JSON strings
    #[arg(short, long)]
    json: bool,

    /// Pretty-print serialized markup
    #[arg(short, long)]
    pretty: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        if e.is_broken_pipe() {
            debug!("stdout closed, stopping");
            return;
        }
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if atty::is(atty::Stream::Stdin) {
        return Err(CliError::NoInput);
    }

    let options = ExtractOptions {
        query: cli.query,
        lines: cli.lines,
        jsonl: cli.jsonl,
        json: cli.json,
        pretty: cli.pretty,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reporter = StderrReporter::new();
    cli::execute(&options, stdin.lock(), &mut stdout.lock(), &mut reporter)?;
    Ok(())
}
