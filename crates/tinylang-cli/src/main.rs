//! Tinylang CLI
//!
//! Command-line interface for the tinylang language: token listing,
//! statement-tree inspection, and program execution over stdin/stdout.

use std::fs;
use std::io;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use tinylang_core::diagnostics::{DiagnosticSeverity, Diagnostics, DiagnosticsOutput};
use tinylang_core::{Interpreter, Lexer, Parser};

#[derive(ClapParser)]
#[command(name = "tinylang")]
#[command(author, version, about = "An interpreter for the tinylang imperative toy language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a source file
    Scan {
        /// Path to the source file
        file: String,
    },

    /// Parse a source file and print the statement tree
    Parse {
        /// Path to the source file
        file: String,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,
    },

    /// Parse and execute a source file against stdin/stdout
    Run {
        /// Path to the source file
        file: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { file } => cmd_scan(&file),
        Commands::Parse { file, format } => cmd_parse(&file, &format),
        Commands::Run { file } => cmd_run(&file),
    }
}

fn read_source(file: &str) -> Result<String, ExitCode> {
    fs::read_to_string(file).map_err(|e| {
        eprintln!(
            "{} Failed to read file '{}': {}",
            "error:".red().bold(),
            file,
            e
        );
        ExitCode::from(2)
    })
}

fn print_diagnostics(diagnostics: &Diagnostics, file: &str) {
    for diag in diagnostics.iter() {
        let severity_str = match diag.severity {
            DiagnosticSeverity::Error => "error".red().bold(),
            DiagnosticSeverity::Warning => "warning".yellow().bold(),
        };

        eprintln!(
            "{}{}: {}",
            severity_str,
            format!("[{}]", diag.code).dimmed(),
            diag
        );
        eprintln!(
            "  {} {}:{}:{}",
            "-->".blue().bold(),
            file,
            diag.span.start.line,
            diag.span.start.column
        );

        if let Some(ref help) = diag.help {
            eprintln!("   {} {}: {}", "=".blue().bold(), "help".bold(), help);
        }
    }
}

fn cmd_scan(file: &str) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut lexer = Lexer::new(&source);
    for token in lexer.tokenize() {
        println!("{}", token);
    }

    let diagnostics = lexer.take_diagnostics();
    print_diagnostics(&diagnostics, file);

    if diagnostics.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_parse(file: &str, format: &str) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let (statements, diagnostics) = Parser::new(&source).parse();

    if diagnostics.has_errors() {
        match format {
            "json" => {
                let output = DiagnosticsOutput::from_diagnostics(&diagnostics);
                println!("{}", serde_json::to_string_pretty(&output).unwrap());
            }
            _ => {
                print_diagnostics(&diagnostics, file);
                let error_count = diagnostics.errors().count();
                eprintln!(
                    "{}: could not parse `{}` due to {} previous error{}",
                    "error".red().bold(),
                    file,
                    error_count,
                    if error_count == 1 { "" } else { "s" }
                );
            }
        }
        return ExitCode::from(1);
    }

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&statements).unwrap());
        }
        _ => {
            print_diagnostics(&diagnostics, file);
            let mut rendered = String::new();
            for statement in &statements {
                statement.render(0, &mut rendered);
            }
            print!("{}", rendered);
        }
    }

    ExitCode::SUCCESS
}

fn cmd_run(file: &str) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let (statements, diagnostics) = Parser::new(&source).parse();

    // Syntax errors are listed exhaustively and gate execution.
    if diagnostics.has_errors() {
        print_diagnostics(&diagnostics, file);
        let error_count = diagnostics.errors().count();
        eprintln!(
            "{}: could not run `{}` due to {} previous error{}",
            "error".red().bold(),
            file,
            error_count,
            if error_count == 1 { "" } else { "s" }
        );
        return ExitCode::from(1);
    }
    print_diagnostics(&diagnostics, file);

    let stdin = io::stdin();
    let mut interpreter = Interpreter::new(stdin.lock(), io::stdout());
    match interpreter.interpret(&statements) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {}", "error:".red().bold(), error);
            ExitCode::from(1)
        }
    }
}
