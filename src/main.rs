//! seaparam - computed oceanographic parameters for CSV data

mod defaults;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use seaparam_core::storage::{read_csv, write_csv};
use seaparam_core::{
    Dataset, DefinitionSource, InMemoryDefinitions, LogNotifier, ProjectSettingsFile,
};
use seaparam_engine::engine::Sandbox;
use seaparam_engine::functions::{ScriptFunctions, SeawaterProvider};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: seaparam [OPTIONS] <DATA.csv>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <DATA.csv>                Bottle or CTD data with a header row");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --settings <FILE>     Project settings JSON with computed_params");
    eprintln!("  -c, --config <FILE>       Column rules TOML");
    eprintln!("  -f, --functions <FILE>    Load custom Rhai functions (can be repeated)");
    eprintln!("  -a, --add <NAME>          Add a computed parameter (can be repeated)");
    eprintln!("  -r, --recompute           Recompute every computed parameter");
    eprintln!("  --check                   Print dependency satisfiability per definition");
    eprintln!("  --columns                 Print the column registry as JSON");
    eprintln!("  -o, --output <FILE>       Export to CSV file");
    eprintln!("  --no-default-config       Ignore settings.toml and default.rhai");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Default, PartialEq)]
struct Options {
    data: PathBuf,
    settings: Option<PathBuf>,
    config: Option<PathBuf>,
    functions: Vec<PathBuf>,
    add: Vec<String>,
    recompute: bool,
    check: bool,
    columns: bool,
    output: Option<PathBuf>,
    no_default_config: bool,
}

#[derive(Debug, PartialEq)]
enum Invocation {
    Help,
    Run(Options),
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut options = Options::default();
    let mut data: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = |flag: &str| -> Result<String, String> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-s" | "--settings" => options.settings = Some(PathBuf::from(value("--settings")?)),
            "-c" | "--config" => options.config = Some(PathBuf::from(value("--config")?)),
            "-f" | "--functions" => options.functions.push(PathBuf::from(value("--functions")?)),
            "-a" | "--add" => options.add.push(value("--add")?),
            "-o" | "--output" => options.output = Some(PathBuf::from(value("--output")?)),
            "-r" | "--recompute" => options.recompute = true,
            "--check" => options.check = true,
            "--columns" => options.columns = true,
            "--no-default-config" => options.no_default_config = true,
            arg if arg.starts_with('-') => return Err(format!("Unknown option: {arg}")),
            _ if data.is_none() => data = Some(PathBuf::from(arg)),
            _ => return Err(format!("Unexpected argument: {arg}")),
        }
        i += 1;
    }

    options.data = data.ok_or_else(|| "a data file is required".to_string())?;
    Ok(Invocation::Run(options))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(options: Options) -> anyhow::Result<()> {
    let settings = defaults::load_settings(options.config.as_deref(), options.no_default_config)?;

    let mut functions = options.functions.clone();
    defaults::prepend_default_functions_if_present(&mut functions, options.no_default_config);
    let mut builder = Sandbox::builder().with_provider(&SeawaterProvider);
    for path in &functions {
        builder = builder.with_provider(&ScriptFunctions::from_file(path));
    }
    let sandbox = builder.build();
    for unavailable in sandbox.unavailable_providers() {
        eprintln!("Warning: {unavailable}");
    }

    let definitions: Box<dyn DefinitionSource> = match &options.settings {
        Some(path) => Box::new(ProjectSettingsFile::new(path)),
        None => Box::new(InMemoryDefinitions::default()),
    };

    let raw = read_csv(&options.data)
        .with_context(|| format!("failed to read {}", options.data.display()))?;
    let (mut dataset, _) = Dataset::ingest(raw, settings, sandbox, definitions)?;

    let mut failures = 0;
    if options.recompute {
        let report = dataset.recompute_all(Some(&mut LogNotifier))?;
        for name in &report.added {
            println!("added {name}");
        }
        for (_, e) in &report.failed {
            eprintln!("Error: {e}");
        }
        failures += report.failed.len();
    }

    for name in &options.add {
        match dataset.add(name) {
            Ok(_) => println!("added {name}"),
            Err(e) if e.is_structural() => return Err(e.into()),
            Err(e) => {
                eprintln!("Error: {e}");
                failures += 1;
            }
        }
    }

    if options.check {
        for status in dataset.check_dependencies()? {
            match status.reason {
                None => println!("{}\tok", status.name),
                Some(reason) => println!("{}\tunsatisfied\t{reason}", status.name),
            }
        }
    }

    if options.columns {
        println!("{}", dataset.registry().to_json_pretty()?);
    }

    if let Some(output_path) = &options.output {
        write_csv(output_path, &dataset)?;
        println!("Exported to {}", output_path.display());
    }

    if failures > 0 {
        bail!("{failures} computed parameter(s) could not be computed");
    }
    Ok(())
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Invocation::Help) => {
            print_usage();
            return;
        }
        Ok(Invocation::Run(options)) => options,
        Err(message) => {
            eprintln!("Error: {message}");
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(options) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_repeatable_options() {
        let parsed = parse_args(&args(&[
            "-a", "A", "data.csv", "--add", "B", "-f", "x.rhai", "--check",
        ]));
        let options = match parsed {
            Ok(Invocation::Run(options)) => options,
            other => panic!("expected options, got {other:?}"),
        };
        assert_eq!(options.data, PathBuf::from("data.csv"));
        assert_eq!(options.add, vec!["A", "B"]);
        assert_eq!(options.functions, vec![PathBuf::from("x.rhai")]);
        assert!(options.check && !options.recompute);
    }

    #[test]
    fn rejects_bad_usage() {
        assert!(parse_args(&args(&["--add"])).is_err());
        assert!(parse_args(&args(&["--bogus", "data.csv"])).is_err());
        assert!(parse_args(&args(&["a.csv", "b.csv"])).is_err());
        assert!(parse_args(&args(&["-r"])).is_err());
        assert_eq!(parse_args(&args(&["-h"])), Ok(Invocation::Help));
    }
}
