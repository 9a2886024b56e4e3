mod debug_report;

use graphmaster::{Graphmaster, Options};
use std::io::{self, IsTerminal, Read};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

fn main() {
    init_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let brain = Graphmaster::with_options(config.options.clone());
    if let Err(err) = load_categories(&brain, &config.categories) {
        eprintln!("{err}");
        std::process::exit(2);
    }

    let res = brain.match_text(&config.input, &config.that, &config.topic);
    let query = debug_report::Query { input: &config.input, that: &config.that, topic: &config.topic };
    debug_report::print_run(&query, &res, config.options.step_budget, config.color);
    if config.stats {
        debug_report::print_tree(&brain.stats(), &brain.activation_report(), config.color);
    }

    match res {
        Ok(Some(_)) => {}
        Ok(None) | Err(_) => std::process::exit(1),
    }
}

/// Initialize tracing when `RUST_LOG` is set, e.g. `RUST_LOG=graphmaster=trace`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(io::stderr))
                .with(filter)
                .init();
        }
    });
}

struct CliConfig {
    input: String,
    that: String,
    topic: String,
    categories: String,
    options: Options,
    stats: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut that = String::new();
    let mut topic = String::new();
    let mut categories: Option<String> = None;
    let mut options = Options::from_env();
    let mut stats = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("graphmaster {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--stats" => stats = true,
            "--categories" | "-c" => {
                let value = args.next().ok_or_else(|| "error: --categories expects a file".to_string())?;
                categories = Some(value);
            }
            "--that" => {
                that = args.next().ok_or_else(|| "error: --that expects a value".to_string())?;
            }
            "--topic" => {
                topic = args.next().ok_or_else(|| "error: --topic expects a value".to_string())?;
            }
            "--budget" => {
                let value = args.next().ok_or_else(|| "error: --budget expects a value".to_string())?;
                options.step_budget = parse_budget(&value)?;
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value);
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    if input.is_some() {
                        return Err("error: input provided multiple times".to_string());
                    }
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--categories=") => {
                categories = Some(arg.trim_start_matches("--categories=").to_string());
            }
            _ if arg.starts_with("--budget=") => {
                options.step_budget = parse_budget(arg.trim_start_matches("--budget="))?;
            }
            _ if arg.starts_with("--that=") => that = arg.trim_start_matches("--that=").to_string(),
            _ if arg.starts_with("--topic=") => topic = arg.trim_start_matches("--topic=").to_string(),
            _ if arg.starts_with("--input=") => {
                let value = arg.trim_start_matches("--input=");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value.to_string());
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(rest);
                break;
            }
        }
    }

    let categories = categories.ok_or_else(|| format!("error: no category file given\n\n{}", help_text()))?;

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    Ok(CliConfig { input, that, topic, categories, options, stats, color })
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn parse_budget(value: &str) -> Result<usize, String> {
    value.parse().map_err(|_| format!("error: invalid --budget '{value}' (expected a number of steps)"))
}

/// Learn every `pattern | that | topic | template` line of `path`.
///
/// Malformed lines are reported and skipped; an overwritten duplicate is
/// reported as a warning.
fn load_categories(brain: &Graphmaster<String>, path: &str) -> Result<(), String> {
    let text =
        std::fs::read_to_string(path).map_err(|err| format!("error: failed to read categories '{path}': {err}"))?;

    for (line_no, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.splitn(4, '|').map(str::trim).collect();
        let &[pattern, that, topic, template] = fields.as_slice() else {
            eprintln!("warning: {path}:{line_no}: expected 'pattern | that | topic | template', skipped");
            continue;
        };

        match brain.learn(pattern, that, topic, template.to_string()) {
            Ok(Some(previous)) => {
                eprintln!("warning: {path}:{line_no}: duplicate category, replaced template '{previous}'");
            }
            Ok(None) => {}
            Err(err) if err.is_malformed_pattern() => {
                eprintln!("warning: {path}:{line_no}: {err}, skipped");
            }
            Err(err) => return Err(format!("error: {path}:{line_no}: {err}")),
        }
    }

    Ok(())
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "graphmaster {version}

Graphmaster pattern-matching CLI.

Usage:
  graphmaster [OPTIONS] --categories <file> [--] <input...>
  graphmaster [OPTIONS] --categories <file> --input <text>

Category file:
  One category per line: pattern | that | topic | template
  Empty that/topic mean '*'. Lines starting with '#' are ignored.

Options:
  -c, --categories <file>    Category file to learn before matching.
  -i, --input <text>         Input text to match. If omitted, reads remaining args
                             or stdin when no args are provided.
  --that <text>              The bot's previous utterance. Default: empty.
  --topic <text>             Conversation topic. Default: empty.
  --budget <steps>           Step budget for the search.
                             Default: ${env} or {default_budget}
  --stats                    Print tree statistics and activation counts.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  A category matched.
  1  No category matched, or the step budget was exceeded.
  2  Invalid arguments or unreadable category file.
",
        version = env!("CARGO_PKG_VERSION"),
        env = graphmaster::STEP_BUDGET_ENV,
        default_budget = graphmaster::DEFAULT_STEP_BUDGET
    )
}
