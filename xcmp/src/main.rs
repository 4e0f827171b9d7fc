#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
enum Error {
    Cmp(xcmp::Error, String),
    Io(io::Error, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Cmp(err, line) => {
                writeln!(f, "Error: {}", err)?;
                if !line.is_empty() {
                    write!(f, "  {}", line)?;
                }
                Ok(())
            }
            Error::Io(err, path) => write!(f, "Error: {}: {}", path.display(), err),
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the source file to compile")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .help("Tokenise the input only"),
        )
        .arg(
            Arg::with_name("tree")
                .long("tree")
                .help("Display the syntax tree only"),
        )
        .arg(
            Arg::with_name("asm")
                .long("asm")
                .help("Display the assembly listing only"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Sets the output file to write to"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let output = matches.value_of("output").unwrap_or("a.out");

    let action = if matches.is_present("tokens") {
        Action::Tokens
    } else if matches.is_present("tree") {
        Action::Tree
    } else if matches.is_present("asm") {
        Action::Asm
    } else {
        Action::Binary
    };

    if let Err(err) = run(input, output, action) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

enum Action {
    Tokens,
    Tree,
    Asm,
    Binary,
}

fn run(input: &str, output: &str, action: Action) -> Result<(), Error> {
    let input_path = Path::new(input);
    let source =
        fs::read_to_string(input_path).map_err(|err| Error::Io(err, input_path.to_owned()))?;
    let cmp_err = |err: xcmp::Error| {
        let line = source_line(&source, &err);
        Error::Cmp(err, line)
    };

    match action {
        Action::Tokens => {
            let mut lexer = xcmp::Lexer::new(&source);
            let stdout = io::stdout();
            lexer.emit_tokens(&mut stdout.lock()).map_err(cmp_err)
        }
        Action::Tree => {
            let program = xcmp::parse_and_fold(&source).map_err(cmp_err)?;
            print!("{}", xcmp::print_tree(&program));
            Ok(())
        }
        Action::Asm => {
            let listing = xcmp::compile_listing(&source).map_err(cmp_err)?;
            print!("{}", listing);
            Ok(())
        }
        Action::Binary => {
            let program = xcmp::compile_binary(&source).map_err(cmp_err)?;
            let output_path = PathBuf::from(output);
            hexfile::write_file(&output_path, &program)
                .map_err(|err| Error::Io(err, output_path))
        }
    }
}

fn source_line(source: &str, err: &xcmp::Error) -> String {
    match err.location() {
        Some(location) => source.lines().nth(location.line).unwrap_or("").to_owned(),
        None => String::new(),
    }
}
