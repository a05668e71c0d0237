use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::Diagnostics;
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::token::Token;
use rox::Lox;

/// Exit status after a lexical, syntax or resolution error.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status after a runtime fault.
const EXIT_RUNTIME_ERROR: i32 = 70;

/// Native stack for the thread that runs programs; sized so the interpreter's
/// call depth limit is reached well before the stack runs out.
const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the token list as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program, or starts a prompt without one
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file as UTF‑8 text
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print and drain every recorded diagnostic to stderr.
fn report(diagnostics: &mut Diagnostics) {
    for error in diagnostics.take_errors() {
        debug!("Reporting: {}", error);
        eprintln!("{}", error);
    }
}

/// Exit status matching the worst diagnostic of a file run.
fn exit_status(diagnostics: &Diagnostics) -> i32 {
    if diagnostics.had_error() {
        EXIT_STATIC_ERROR
    } else if diagnostics.had_runtime_error() {
        EXIT_RUNTIME_ERROR
    } else {
        0
    }
}

/// Scan `source`, printing lexical errors.  `None` when there were any.
fn scan_or_report(source: &str) -> Option<Vec<Token>> {
    let (tokens, errors) = Scanner::new(source).scan_tokens();

    if errors.is_empty() {
        return Some(tokens);
    }

    for e in errors {
        eprintln!("{}", e);
    }

    None
}

fn no_input() -> ! {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn tokenize(source: &str, json: bool) -> Result<i32> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if !json {
                    println!("{}", token);
                }

                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;

                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if json {
        let rendered =
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");

        return Ok(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");

    Ok(0)
}

fn parse(source: &str) -> i32 {
    let Some(tokens) = scan_or_report(source) else {
        return EXIT_STATIC_ERROR;
    };

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => {
            info!("Expression parsed successfully");

            let ast_str = AstPrinter::print(&expr);

            debug!("AST: {}", ast_str);
            println!("{}", ast_str);

            0
        }

        Err(errors) => {
            for e in errors {
                debug!("Parse debug: {}", e);
                eprintln!("{}", e);
            }

            EXIT_STATIC_ERROR
        }
    }
}

fn evaluate(source: &str) -> i32 {
    let mut lox = Lox::new();

    if let Some(value) = lox.evaluate(source) {
        debug!("Evaluated to: {}", value);
    }

    report(lox.diagnostics_mut());

    exit_status(lox.diagnostics())
}

fn run_file(source: &str) -> i32 {
    info!("Provided input:\n {}", source);

    let mut lox = Lox::new();
    lox.run(source);

    report(lox.diagnostics_mut());

    exit_status(lox.diagnostics())
}

/// Read‑eval‑print loop.  Every line runs against the same globals; errors
/// are reported and then forgotten so the next line starts clean.
fn run_prompt() -> Result<()> {
    info!("Starting interactive prompt");

    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line: String = line.context("Failed to read from stdin")?;

        debug!("Prompt line: {}", line);

        lox.run(&line);

        report(lox.diagnostics_mut());
        lox.diagnostics_mut().reset_static();
    }

    println!();
    info!("Prompt closed");

    Ok(())
}

fn dispatch(commands: Commands) -> Result<i32> {
    let status: i32 = match commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let source = read_file(filename.unwrap_or_else(|| no_input()))?;
            tokenize(&source, json)?
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");
            let source = read_file(filename.unwrap_or_else(|| no_input()))?;
            parse(&source)
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");
            let source = read_file(filename.unwrap_or_else(|| no_input()))?;
            evaluate(&source)
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let source = read_file(filename)?;
                run_file(&source)
            }

            None => {
                run_prompt()?;
                0
            }
        },
    };

    Ok(status)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    // Deep Lox recursion needs more native stack than the main thread has.
    let status: i32 = thread::Builder::new()
        .name("rox-interpreter".into())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(args.commands))
        .context("Failed to start interpreter thread")?
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))??;

    if status != 0 {
        debug!("Exiting with code {}", status);
        std::process::exit(status);
    }

    Ok(())
}
