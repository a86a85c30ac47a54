use std::io::{self, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use log::debug;

use ogrinfo::errors::InfoError;
use ogrinfo::report;
use ogrinfo::vector::driver_names;

mod cli;

fn usage(message: &str) -> ExitCode {
    print!("{}", cli::USAGE);
    eprintln!("\nFAILURE: {message}");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let argv = match cli::normalize(std::env::args_os()) {
        Ok(argv) => argv,
        Err(message) => return usage(&message),
    };
    let args = match cli::Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => return usage(&cli::failure_message(&e)),
    };

    if args.formats {
        println!("Supported Formats:");
        for driver in driver_names() {
            println!("  -> \"{driver}\"");
        }
        return ExitCode::SUCCESS;
    }

    let config = match args.into_configuration() {
        Ok(config) => config,
        Err(InfoError::BadArgument(message)) => return usage(&message),
        Err(e) => {
            eprintln!("FAILURE: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("{config:?}");

    let stdout = io::stdout();
    let mut report = stdout.lock();
    let result = report::run(&config, &mut report, &mut io::stderr());
    let _ = report.flush();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(InfoError::OpenFailure { path, drivers }) => {
            eprintln!(
                "FAILURE:\nUnable to open datasource `{}' with the following drivers.",
                path.display()
            );
            for driver in drivers {
                println!("  -> {driver}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("FAILURE: {e}");
            ExitCode::FAILURE
        }
    }
}
