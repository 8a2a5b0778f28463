//! shellgate: interactive front end.
//!
//! Reads instructions line by line, prints the resolved command, then the
//! result or the reason it was refused. `exit`/`quit` or end of input stops.
//!
//!   shellgate [--config PATH] [--verbose] [--dump-config] [-c INSTRUCTION [--json]]

use std::io::{BufRead, Write};
use std::path::PathBuf;

use log::LevelFilter;
use shellgate::config::Config;
use shellgate::pipeline::{Gatekeeper, Outcome};

const USAGE: &str = "usage: shellgate [--config PATH] [--verbose] [--dump-config] [-c INSTRUCTION [--json]]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    verbose: bool,
    dump_config: bool,
    instruction: Option<String>,
    json: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
            }
            "-v" | "--verbose" => args.verbose = true,
            "--dump-config" => args.dump_config = true,
            "-c" => args.instruction = Some(it.next().ok_or("-c needs an instruction")?),
            "--json" => args.json = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    if args.json && args.instruction.is_none() {
        return Err("--json only applies with -c".into());
    }
    Ok(args)
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Unresolved => println!("could not resolve to a command, try again"),
        Outcome::Denied { reason, .. } => println!("denied: {reason}"),
        Outcome::Failed { message, .. } => println!("{message}"),
        Outcome::Succeeded { output, .. } => {
            println!("--- result ---");
            println!("{}", output.trim_end());
            println!("--------------\n");
        }
    }
}

fn handle_verbose(gatekeeper: &Gatekeeper, instruction: &str) -> Outcome {
    let command = gatekeeper.resolve(instruction);
    if command.is_empty() {
        return Outcome::Unresolved;
    }
    println!("running: {command}");
    gatekeeper.run(command)
}

fn repl(gatekeeper: &Gatekeeper) {
    println!("shellgate running, type 'exit' or 'quit' to leave");
    println!("{}", "-".repeat(20));

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("shellgate> ");
        let _ = std::io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("failed to read input: {e}");
                break;
            }
        }

        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("bye");
            break;
        }
        print_outcome(&handle_verbose(gatekeeper, input));
    }
}

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("shellgate: {e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let term_level = if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    shellgate::logging::init(term_level, shellgate::logging::default_log_path().as_deref());

    let config = Config::load(args.config.as_deref());
    if args.dump_config {
        match config.to_toml() {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("shellgate: cannot serialize config: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let gatekeeper = Gatekeeper::from_config(&config);
    if let Err(e) = gatekeeper.policy().ensure_roots() {
        log::error!("cannot create allowed roots: {e}");
    }

    let Some(instruction) = args.instruction else {
        repl(&gatekeeper);
        return;
    };

    let outcome = if args.json {
        let outcome = gatekeeper.handle(&instruction);
        match serde_json::to_string(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("shellgate: cannot serialize outcome: {e}"),
        }
        outcome
    } else {
        let outcome = handle_verbose(&gatekeeper, &instruction);
        print_outcome(&outcome);
        outcome
    };
    if !outcome.is_success() {
        std::process::exit(1);
    }
}
