// gridcalc-cli/src/main.rs
// Command-line interface for gridcalc

use clap::{Parser, Subcommand};
use gridcalc_core::{new_sheet, Position, Sheet};
use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gridcalc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Repl,

    /// Run commands from a script file
    Run {
        /// Path to the script (one command per line, '#' starts a comment)
        script: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { script }) => run_script(&script),
        Some(Commands::Repl) | None => repl(),
    }
}

fn repl() -> Result<(), Box<dyn std::error::Error>> {
    println!("gridcalc interactive session. Type 'help' for commands.");

    let mut sheet = new_sheet();
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;
                if execute(&mut sheet, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Input error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn run_script(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    debug!("running script {}", path.display());
    let mut sheet = new_sheet();

    for line in fs::read_to_string(path)?.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if execute(&mut sheet, line) {
            break;
        }
    }

    Ok(())
}

// Runs one command against the sheet. Returns true when the session should
// end. Engine errors are printed, never fatal.
fn execute(sheet: &mut Sheet, line: &str) -> bool {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim_start()),
        None => (line, ""),
    };

    let result = match command {
        "quit" | "exit" => return true,
        "help" => {
            print_help();
            Ok(())
        }
        "set" => cmd_set(sheet, rest),
        "clear" => with_position(rest, |pos| {
            sheet.clear(pos).map_err(|e| e.to_string())
        }),
        "value" => with_position(rest, |pos| {
            match sheet.get(pos).map_err(|e| e.to_string())? {
                Some(cell) => println!("{}", cell.value(sheet)),
                None => println!("(empty)"),
            }
            Ok(())
        }),
        "text" => with_position(rest, |pos| {
            match sheet.get(pos).map_err(|e| e.to_string())? {
                Some(cell) => println!("{}", cell.text()),
                None => println!("(empty)"),
            }
            Ok(())
        }),
        "refs" => with_position(rest, |pos| {
            match sheet.get(pos).map_err(|e| e.to_string())? {
                Some(cell) => {
                    let refs: Vec<String> = cell
                        .referenced_cells()
                        .iter()
                        .map(|r| r.to_a1())
                        .collect();
                    println!("[{}]", refs.join(", "));
                }
                None => println!("(empty)"),
            }
            Ok(())
        }),
        "size" => {
            let size = sheet.printable_size();
            println!("{} x {}", size.rows, size.cols);
            Ok(())
        }
        "values" => sheet
            .print_values(&mut io::stdout())
            .map_err(|e| e.to_string()),
        "texts" => sheet
            .print_texts(&mut io::stdout())
            .map_err(|e| e.to_string()),
        _ => {
            eprintln!("Unknown command: {} (try 'help')", command);
            Ok(())
        }
    };

    if let Err(message) = result {
        eprintln!("{}", message);
    }

    false
}

fn cmd_set(sheet: &mut Sheet, args: &str) -> Result<(), String> {
    let (pos_str, text) = match args.split_once(char::is_whitespace) {
        Some((pos_str, text)) => (pos_str, text),
        None => (args, ""),
    };
    let pos = parse_position(pos_str)?;
    sheet.set(pos, text).map_err(|e| e.to_string())
}

fn with_position(
    args: &str,
    action: impl FnOnce(Position) -> Result<(), String>,
) -> Result<(), String> {
    let pos = parse_position(args.trim())?;
    action(pos)
}

fn parse_position(text: &str) -> Result<Position, String> {
    Position::from_a1(text).ok_or_else(|| format!("Not a cell reference: {:?}", text))
}

fn print_help() {
    println!("Commands:");
    println!("  set <CELL> <text>   store text (prefix with '=' for a formula)");
    println!("  clear <CELL>        empty a cell");
    println!("  value <CELL>        show the computed value");
    println!("  text <CELL>         show the stored text");
    println!("  refs <CELL>         show the cells a formula reads");
    println!("  size                show the printable size");
    println!("  values              print all computed values");
    println!("  texts               print all stored texts");
    println!("  quit                leave the session");
}
