use clap::{Parser as ClapParser, Subcommand};
use keypath_lang::cli::{self, CliError, GetOptions, RunResult, SetOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "keypath")]
#[command(about = "Keypath - a path expression language for reading and writing nested JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the value a pattern addresses in the input
    Get {
        /// The keypath pattern to evaluate
        pattern: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON lookup table for `%` keys
        #[arg(short, long)]
        lookup: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Write a value at a pattern, creating missing containers
    Set {
        /// The keypath pattern to write at
        pattern: String,

        /// JSON value to write
        value: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON lookup table for `%` keys
        #[arg(short, long)]
        lookup: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate a pattern and print its canonical form
    Check {
        /// The keypath pattern to validate
        pattern: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Get {
            pattern,
            input,
            lookup,
            pretty,
        } => run_get(pattern, input, lookup, pretty),
        Commands::Set {
            pattern,
            value,
            input,
            lookup,
            pretty,
        } => run_set(pattern, value, input, lookup, pretty),
        Commands::Check { pattern } => match cli::execute_check(&pattern) {
            Ok(canonical) => {
                println!("{}", canonical);
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_get(
    pattern: String,
    input: Option<String>,
    lookup: Option<String>,
    pretty: bool,
) -> Result<(), CliError> {
    let options = GetOptions {
        pattern,
        input: read_input(input)?,
        lookup,
        pretty,
    };
    print_result(cli::execute_get(&options)?, pretty)
}

fn run_set(
    pattern: String,
    value: String,
    input: Option<String>,
    lookup: Option<String>,
    pretty: bool,
) -> Result<(), CliError> {
    let options = SetOptions {
        pattern,
        value,
        input: read_input(input)?,
        lookup,
        pretty,
    };
    print_result(cli::execute_set(&options)?, pretty)
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn print_result(result: RunResult, pretty: bool) -> Result<(), CliError> {
    match result {
        RunResult::Absent => println!("undefined"),
        RunResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }
            .map_err(CliError::Json)?;
            println!("{}", json);
        }
    }
    Ok(())
}
