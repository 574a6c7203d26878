use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use escape_engine::InteractTrigger;
use escape_sim::{parse_script, run, OutputFormat, SimOptions};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut options = SimOptions::default();
    let mut script_path: Option<String> = None;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "--json" => {
                options.format = OutputFormat::Json;
                index += 1;
            }
            "--trigger" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --trigger".to_string())?;
                options.interact_trigger = value
                    .parse::<InteractTrigger>()
                    .map_err(|err| format!("invalid --trigger value: {err}"))?;
                index += 2;
            }
            "--tps" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --tps".to_string())?;
                options.target_tps = value
                    .parse::<u32>()
                    .ok()
                    .filter(|tps| *tps > 0)
                    .ok_or_else(|| format!("invalid --tps value '{value}' (expected u32 > 0)"))?;
                index += 2;
            }
            "--layout" => {
                let path = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --layout".to_string())?;
                let raw = fs::read_to_string(path)
                    .map_err(|err| format!("failed to read layout '{path}': {err}"))?;
                options.layout_json = Some(raw);
                index += 2;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'\n\n{}", usage_text()));
            }
            path => {
                if script_path.is_some() {
                    return Err("only one script file may be given".to_string());
                }
                script_path = Some(path.to_string());
                index += 1;
            }
        }
    }

    let content = match &script_path {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("failed to read script '{path}': {err}"))?,
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .map_err(|err| format!("failed to read script from stdin: {err}"))?;
            content
        }
    };
    let commands = parse_script(&content)?;
    run(&commands, &options, &mut io::stdout())
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "escape_sim - headless scripted run of the escape game controller",
        "",
        "Usage:",
        "  escape_sim [--json] [--trigger edge|level] [--tps <u32>] [--layout <file>] [script]",
        "",
        "Reads the script from stdin when no file is given. Commands, one per line:",
        "  hold <action> <ticks>     hold up|down|left|right|interact|cancel",
        "  press <action>            press and release within one tick",
        "  wait <ticks>              run ticks with no input",
        "  complete success|fail     report the waiting minigame's result",
        "  advance <seconds>         move the simulated clock without ticking",
        "  dump                      print the current state",
    ]
    .join("\n")
}
