use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use rolox as lox;

use clap::Parser as ClapParser;
use clap::Subcommand;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Lox script to run; starts a REPL when omitted
    script: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes the provided input from a given valid filepath
    Tokenize { filename: PathBuf },

    /// Parses the provided input and prints the syntax tree
    Parse { filename: PathBuf },

    /// Runs the provided script
    Run { filename: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let args: Cli = Cli::parse();

    match args.command {
        Some(Commands::Tokenize { filename }) => tokenize(&filename),

        Some(Commands::Parse { filename }) => parse(&filename),

        Some(Commands::Run { filename }) => run_file(&filename),

        None => match args.script {
            Some(filename) => run_file(&filename),
            None => run_prompt()?,
        },
    }

    Ok(())
}

/// Read a script, exiting with the usage code when the path is unreadable
/// and the compile-error code when it is not valid UTF-8.
fn read_source(path: &Path) -> Vec<u8> {
    let buf = match fs::read(path) {
        Ok(buf) => buf,

        Err(e) => {
            eprintln!("Could not read {}: {}", path.display(), e);
            process::exit(64);
        }
    };

    match String::from_utf8(buf) {
        Ok(text) => text.into_bytes(),

        Err(e) => {
            eprintln!("{}", LoxError::from(e));
            process::exit(65);
        }
    }
}

fn tokenize(path: &Path) {
    match Scanner::new(read_source(path)).scan() {
        Ok(tokens) => {
            for token in &tokens {
                println!("{}", token);
            }
        }

        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            process::exit(65);
        }
    }
}

fn parse(path: &Path) {
    let tokens = match Scanner::new(read_source(path)).scan() {
        Ok(tokens) => tokens,

        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            process::exit(65);
        }
    };

    match Parser::new(tokens).parse() {
        Ok(statements) => println!("{}", AstPrinter::print_program(&statements)),

        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            process::exit(65);
        }
    }
}

fn run_file(path: &Path) {
    let mut interpreter = Interpreter::new();

    if let Some(code) = run(read_source(path), &mut interpreter) {
        process::exit(code);
    }
}

/// One line at a time against a persistent interpreter, so definitions from
/// earlier lines stay visible.  Compile errors only poison their own line.
fn run_prompt() -> io::Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        // Errors were already reported; the session continues.
        let _ = run(line.into_bytes(), &mut interpreter);
    }

    Ok(())
}

/// Run the full pipeline over `source`.  Returns the exit code to terminate
/// with, or `None` on success.  Each stage's errors go to stderr and stop the
/// later stages, per the 65 (compile) / 70 (runtime) split.
fn run(source: Vec<u8>, interpreter: &mut Interpreter) -> Option<i32> {
    let tokens = match Scanner::new(source).scan() {
        Ok(tokens) => tokens,

        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            return Some(65);
        }
    };

    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            return Some(65);
        }
    };

    if let Err(errors) = Resolver::new().resolve(&statements) {
        for error in errors {
            eprintln!("{}", error);
        }
        return Some(65);
    }

    match interpreter.interpret(&statements) {
        Ok(()) => None,

        Err(e) => {
            eprintln!("{}", e);
            Some(70)
        }
    }
}
