use std::{
    io::{stdin, stdout, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use errors::ErrorReporter;

/// Exit status for input that failed to scan or parse (EX_DATAERR).
const EXIT_DATA_ERROR: u8 = 65;

#[derive(Debug, Clone, Copy, Default, PartialEq, clap::ValueEnum)]
enum Emit {
    /// One token per line.
    #[default]
    Tokens,
    /// The parsed expression tree.
    Ast,
}

#[derive(clap::Parser)]
#[command(about = "Scan and parse Lox expressions")]
struct Args {
    /// Script to process. Starts an interactive prompt if omitted.
    file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t)]
    emit: Emit,
}

fn run_file(path: PathBuf, emit: Emit) -> anyhow::Result<ExitCode> {
    let source = std::fs::read_to_string(&path)?;
    log::info!("Running {}", path.display());

    let mut errors = ErrorReporter::new();
    run(&source, emit, &mut errors);

    Ok(if errors.had_error() { ExitCode::from(EXIT_DATA_ERROR) } else { ExitCode::SUCCESS })
}

fn run_prompt(emit: Emit) -> anyhow::Result<ExitCode> {
    let mut errors = ErrorReporter::new();
    loop {
        print!("> ");
        stdout().flush()?;

        let mut line = String::new();
        if stdin().read_line(&mut line)? == 0 {
            return Ok(ExitCode::SUCCESS);
        }

        run(&line, emit, &mut errors);
        // A bad line must not poison the rest of the session
        errors.reset();
    }
}

fn run(source: &str, emit: Emit, errors: &mut ErrorReporter) {
    let tokens = scanner::scan(source, errors);

    match emit {
        Emit::Tokens => {
            for token in &tokens {
                println!("{}", token);
            }
        }
        Emit::Ast => {
            let expr = parser::parse(&tokens, errors);
            if let (Some(expr), false) = (expr, errors.had_error()) {
                println!("{}", expr);
            }
        }
    }

    for error in errors.errors().iter() {
        eprintln!("{}", error);
    }
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    match args.file {
        Some(file) => run_file(file, args.emit),
        None => run_prompt(args.emit),
    }
}
