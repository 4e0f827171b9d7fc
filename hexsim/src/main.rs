#[macro_use]
extern crate clap;

use clap::{Arg, ArgGroup};
use std::process;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("BINARY")
                .help("Sets the binary file to simulate")
                .index(1),
        )
        .arg(
            Arg::with_name("assembly")
                .short("a")
                .long("assembly")
                .takes_value(true)
                .value_name("ASSEMBLY")
                .help("Assembles and runs a source file directly"),
        )
        .arg(
            Arg::with_name("dump")
                .short("d")
                .long("dump")
                .help("Dump the loaded binary contents and exit"),
        )
        .arg(
            Arg::with_name("trace")
                .short("t")
                .long("trace")
                .help("Enable instruction tracing"),
        )
        .group(
            ArgGroup::with_name("input")
                .args(&["BINARY", "assembly"])
                .required(true),
        )
        .get_matches();

    let options = hexsim::Options {
        dump: matches.is_present("dump"),
        trace: matches.is_present("trace"),
        max_cycles: 0,
    };

    let result = match matches.value_of("BINARY") {
        Some(binary) => hexsim::run_file(binary, options),
        None => hexsim::run_assembly_file(matches.value_of("assembly").unwrap(), options),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
