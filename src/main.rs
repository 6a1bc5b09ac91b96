use std::fs::write;
use std::process::exit;

use clap::{App, Arg};

mod check;
mod exec;
mod grader;
mod report;
mod scoring;
mod suite;

use grader::Grader;

fn main() {
    let cli_args = App::new("autograder")
        .version("1.0")
        .about("Runs student submissions against predefined test suites and scores the results")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("CONFIG_FILE")
                .required(true)
                .takes_value(true)
                .help("Toml formatted grading configuration file"),
        )
        .arg(
            Arg::with_name("suite")
                .value_name("SUITE")
                .index(1)
                .default_value("ALL")
                .help("Suite to run; ALL runs every configured suite, CLEAN only removes run artifacts"),
        )
        .arg(
            Arg::with_name("json")
                .short("j")
                .long("json-output")
                .takes_value(true)
                .value_name("JSON_OUT")
                .help("writes grading results in json format to specific file"),
        )
        .get_matches();

    let grader = match Grader::from_file(cli_args.value_of("config").unwrap()) {
        Ok(grader) => grader,
        Err(err) => {
            eprintln!("Error: {}", err);
            exit(1);
        }
    };

    let selector = cli_args.value_of("suite").unwrap();
    let run = match grader.run(selector) {
        Ok(run) => run,
        Err(err) => {
            eprintln!("Error: {}", err);
            exit(1);
        }
    };

    if selector != "CLEAN" {
        println!("Total score: {:.2}", run.total_score);
    }

    if let Some(json_out) = cli_args.value_of("json") {
        let report = match run.get_json_report() {
            Ok(report) => report,
            Err(err) => {
                eprintln!("Error: {}", err);
                exit(1);
            }
        };
        if let Err(err) = write(json_out, report) {
            eprintln!("Error: cannot write json file {}: {}", json_out, err);
            exit(1);
        }
    }
}
