use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use object_mapper::{MappingDeclaration, ProfileDocument};

#[derive(Parser, Debug)]
#[command(name = "object-mapper")]
#[command(about = "Validate a declarative mapping profile and summarize its rules")]
struct Args {
    /// Path to the profile document (YAML)
    profile: String,

    /// Print the normalized profile as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let document = match ProfileDocument::from_path(&args.profile) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            eprintln!("\nUsage: object-mapper <profile.yaml> [--json] [-v]");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        return match serde_json::to_string_pretty(&document) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("\n❌ Error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    print!("{}", summarize(&args.profile, &document));
    ExitCode::SUCCESS
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn summarize(path: &str, document: &ProfileDocument) -> String {
    let mut output = format!(
        "=== Mapping Profile: {} ===\n",
        document.name.as_deref().unwrap_or(path)
    );
    output.push_str(&format!("  ✓ {} type mapping(s) validated\n", document.mappings.len()));
    for mapping in &document.mappings {
        output.push_str(&summarize_mapping(mapping));
    }
    output
}

fn summarize_mapping(mapping: &MappingDeclaration) -> String {
    let options = &mapping.options;
    let mut output = format!(
        "\n{} -> {}\n  ignore_case: {}, map_null_values: {}, deep_copy: {}\n",
        mapping.source, mapping.destination, options.ignore_case, options.map_null_values, options.deep_copy
    );

    let mut custom: Vec<_> = options.custom_mappings.iter().collect();
    custom.sort();
    for (source, destination) in custom {
        output.push_str(&format!("  ~ {} => {}\n", source, destination));
    }

    for field in &mapping.fields {
        match &field.from {
            Some(from) => output.push_str(&format!("  - {} <- {}\n", field.destination, from)),
            None => output.push_str(&format!("  - {} (ignored)\n", field.destination)),
        }
    }
    output
}
