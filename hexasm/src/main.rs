#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
enum Error {
    Asm(hexasm::Error, String),
    Io(io::Error, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Asm(err, line) => {
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
                .help("Sets the input file to use")
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
                .help("Display the resolved directive listing only"),
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

    if let Err(err) = run(
        input,
        output,
        matches.is_present("tokens"),
        matches.is_present("tree"),
    ) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run(input: &str, output: &str, tokens_only: bool, tree_only: bool) -> Result<(), Error> {
    let input_path = Path::new(input);
    let source =
        fs::read_to_string(input_path).map_err(|err| Error::Io(err, input_path.to_owned()))?;

    if tokens_only {
        let mut lexer = hexasm::Lexer::new(&source);
        let stdout = io::stdout();
        return lexer
            .emit_tokens(&mut stdout.lock())
            .map_err(|err| Error::Io(err, PathBuf::from("<stdout>")));
    }

    let codegen = hexasm::parse(&source)
        .and_then(hexasm::CodeGen::new)
        .map_err(|err| Error::Asm(err.clone(), source_line(&source, &err)))?;

    if tree_only {
        let stdout = io::stdout();
        return codegen
            .emit_listing(&mut stdout.lock())
            .map_err(|err| Error::Io(err, PathBuf::from("<stdout>")));
    }

    let output_path = PathBuf::from(output);
    hexfile::write_file(&output_path, &codegen.assemble())
        .map_err(|err| Error::Io(err, output_path))
}

fn source_line(source: &str, err: &hexasm::Error) -> String {
    match err.location() {
        Some(location) => source.lines().nth(location.line).unwrap_or("").to_owned(),
        None => String::new(),
    }
}
