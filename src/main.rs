use clap::{Parser as ClapParser, Subcommand};
use ngexpr::cli::{self, CliError, EvalOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "ngexpr")]
#[command(about = "ngexpr - Parse, evaluate and watch template expressions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of an expression
    Tokens {
        expression: String,
    },

    /// Validate syntax and print the canonical form
    Check {
        expression: String,
    },

    /// Evaluate an expression against a JSON scope
    Eval {
        /// The expression to evaluate
        expression: String,

        /// JSON scope (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the watch tree an expression bridges to
    Watch {
        expression: String,

        /// Watch the result as a collection
        #[arg(short, long)]
        collection: bool,
    },
}

/// Install a `tracing` subscriber when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tokens { expression } => cli::execute_tokens(&expression).map(|lines| {
            for line in lines {
                println!("{}", line);
            }
        }),
        Commands::Check { expression } => cli::execute_check(&expression).map(|canonical| {
            println!("Syntax is valid: {}", canonical);
        }),
        Commands::Eval {
            expression,
            input,
            pretty,
        } => run_eval(expression, input, pretty),
        Commands::Watch {
            expression,
            collection,
        } => cli::execute_watch(&expression, collection).map(|tree| println!("{}", tree)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_eval(expression: String, input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = EvalOptions {
        expression,
        input,
        pretty,
    };

    let output = cli::execute_eval(&options)?;
    let json = if options.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);
    Ok(())
}
