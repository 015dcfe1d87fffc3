// Command-line interface for jira
//
// This binary converts issue text between Markdown and the Atlassian Document Format (ADF) that
// the Jira REST API speaks. The conversion itself lives in the jira-adf crate; this is the shell
// around it: argument parsing, configuration, logging, and file/stdin/stdout plumbing.
//
// Converting:
//
// The conversion needs a to and from pair. The from can be auto-detected from the file extension,
// while being overwrittable by an explicit --from flag. Reading from stdin ("-") needs --from.
// Usage:
//  jira <input> --to <format> [--from <format>] [--output <file>] [--compact]  - Convert (default)
//  jira convert <input> --to <format> ...                                      - Same as above (explicit)
//  jira --list-formats                                                         - List available formats
//
// Extra Parameters:
//
// Format-specific parameters can be passed using --extra-<parameter-name> <value>.
// Parameters naming a conversion rule (bullet-marker, mark-equality, soft-breaks-as-hard,
// max-input-bytes) override the configuration; the rest are passed to the target format.
// Example:
//  jira notes.md --to adf --extra-soft-breaks-as-hard
//  jira issue.json --to markdown --extra-bullet-marker '*'

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use jira_adf::{FormatRegistry, MarkEquality};
use jira_config::{JiraConfig, Loader, LOCAL_CONFIG_FILE};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use tracing_subscriber::EnvFilter;

const SUBCOMMANDS: &[&str] = &["convert", "help"];

/// Log levels from quietest to loudest; each `-v` moves one step right.
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
/// - `--extras-<key>` (alias for `--extra-<key>`)
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        let key_opt = if let Some(key) = arg.strip_prefix("--extra-") {
            Some(key)
        } else {
            arg.strip_prefix("--extras-")
        };

        if let Some(key) = key_opt {
            // A following arg that is not a flag is the value; a lone `-` is a value too
            let has_value = args
                .get(i + 1)
                .is_some_and(|next| next == "-" || !next.starts_with('-'));

            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("jira")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert Jira issue text between Markdown and ADF")
        .long_about(
            "jira converts rich text between Markdown and the Atlassian Document Format (ADF)\n\
            used by the Jira REST API for issue descriptions and comments.\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to override conversion rules or pass format options.\n  \
            Boolean flags can omit the value (defaults to 'true').\n\n\
            Examples:\n  \
            jira description.md --to adf                 # Markdown to ADF JSON (stdout)\n  \
            jira comment.json --to markdown -o out.md    # ADF JSON to a Markdown file\n  \
            cat notes.md | jira - --from markdown --to adf --compact"
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a jira.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (repeat for more detail)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between Markdown and ADF.\n\n\
                    Supported formats:\n  \
                    - markdown: GitHub-flavored Markdown (.md, .markdown)\n  \
                    - adf:      Atlassian Document Format JSON (.json, .adf)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.\n\n\
                    Examples:\n  \
                    jira convert input.md --to adf                 # Convert to ADF (stdout)\n  \
                    jira convert issue.json --to markdown -o a.md  # ADF to a Markdown file\n  \
                    jira input.md --to adf --compact               # 'convert' is optional"
                )
                .arg(
                    Arg::new("input")
                        .help("Input file path, or '-' for stdin")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (auto-detected from file extension if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("compact")
                        .long("compact")
                        .help("Write ADF JSON on a single line")
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Parse the command line, injecting `convert` when the first argument is an
/// input rather than a subcommand.
fn parse_cli(args: &[String]) -> ArgMatches {
    let cli = build_cli();
    match cli.clone().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) => {
            if should_inject_convert(args) {
                let mut injected = vec![args[0].clone(), "convert".to_string()];
                injected.extend_from_slice(&args[1..]);
                cli.try_get_matches_from(&injected)
                    .unwrap_or_else(|e2| e2.exit())
            } else {
                e.exit()
            }
        }
    }
}

fn should_inject_convert(args: &[String]) -> bool {
    args.get(1).is_some_and(|first| {
        (first == "-" || !first.starts_with('-')) && !SUBCOMMANDS.contains(&first.as_str())
    })
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);
    let matches = parse_cli(&cleaned_args);

    let mut config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    apply_config_overrides(&mut config, &mut extra_params);
    init_tracing(&config.log.level, matches.get_count("verbose"));

    if matches.get_flag("list-formats") {
        handle_list_formats_command();
        return;
    }

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            let (Some(input), Some(to)) = (
                sub_matches.get_one::<String>("input"),
                sub_matches.get_one::<String>("to"),
            ) else {
                fail("Both an input and --to are required. Use --help for usage information.");
            };

            let from = match sub_matches.get_one::<String>("from") {
                Some(from) => from.to_string(),
                None => detect_source_format(input),
            };
            let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
            let compact = sub_matches.get_flag("compact");

            handle_convert_command(input, &from, to, output, compact, &extra_params, &config);
        }
        _ => fail("Unknown subcommand. Use --help for usage information."),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn detect_source_format(input: &str) -> String {
    if input == "-" {
        fail("Error: Reading from stdin requires --from");
    }
    let registry = FormatRegistry::default();
    match registry.detect_format_from_filename(input) {
        Some(detected) => detected,
        None => {
            eprintln!("Error: Could not detect format from filename '{input}'");
            fail("Please specify --from explicitly");
        }
    }
}

/// Handle the convert command
fn handle_convert_command(
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    compact: bool,
    extra_params: &HashMap<String, String>,
    config: &JiraConfig,
) {
    let registry = FormatRegistry::with_rules(config.conversion_rules());

    for name in [from, to] {
        if let Err(e) = registry.get(name) {
            fail(&format!("Error: {e}"));
        }
    }

    let source = read_input(input).unwrap_or_else(|e| {
        let name = if input == "-" { "stdin" } else { input };
        fail(&format!("Error reading '{name}': {e}"));
    });

    let doc = registry
        .parse(&source, from)
        .unwrap_or_else(|e| fail(&format!("Parse error: {e}")));
    tracing::debug!(from, to, blocks = doc.content.len(), "parsed input");

    let mut format_options = extra_params.clone();
    if compact {
        if to == "adf" {
            format_options.insert("pretty".to_string(), "false".to_string());
        } else {
            tracing::warn!(to, "--compact only applies to adf output");
        }
    }

    let result = registry
        .serialize_with_options(&doc, to, &format_options)
        .unwrap_or_else(|e| fail(&format!("Serialization error: {e}")));

    match output {
        Some(path) => {
            fs::write(path, result).unwrap_or_else(|e| {
                fail(&format!("Error writing file '{path}': {e}"));
            });
        }
        None => print!("{result}"),
    }
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input)
    }
}

/// Handle the list-formats command
fn handle_list_formats_command() {
    let registry = FormatRegistry::default();
    println!("Available formats:\n");
    for name in registry.list_formats() {
        if let Ok(format) = registry.get(&name) {
            println!(
                "  {name:<10} {} (.{})",
                format.description(),
                format.file_extensions().join(", .")
            );
        }
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> JiraConfig {
    let loader = Loader::new().with_optional_file(LOCAL_CONFIG_FILE);
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        fail(&format!("Failed to load configuration: {err}"));
    })
}

/// `RUST_LOG` wins; otherwise the configured level, raised one step per `-v`.
fn init_tracing(configured: &str, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(raise_level(configured, verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Raise a plain level name by `steps`. Anything that is not a plain level
/// (a full filter directive) is used as is.
fn raise_level(configured: &str, steps: u8) -> String {
    let normalized = configured.trim().to_lowercase();
    match LOG_LEVELS.iter().position(|level| *level == normalized) {
        Some(index) => {
            let raised = (index + steps as usize).min(LOG_LEVELS.len() - 1);
            LOG_LEVELS[raised].to_string()
        }
        None => configured.to_string(),
    }
}

fn apply_config_overrides(config: &mut JiraConfig, extra_params: &mut HashMap<String, String>) {
    if let Some(raw) = take_override(extra_params, &["bullet-marker", "bullet"]) {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(marker @ ('-' | '*' | '+')), None) => config.convert.bullet_marker = marker,
            _ => fail(&format!(
                "Invalid bullet marker '{raw}' for --extra-bullet-marker (use -, * or +)"
            )),
        }
    }

    if let Some(raw) = extra_params.remove("mark-equality") {
        config.convert.mark_equality = match raw.to_lowercase().as_str() {
            "set" => MarkEquality::Set,
            "positional" => MarkEquality::Positional,
            other => fail(&format!(
                "Invalid value '{other}' for --extra-mark-equality (use set or positional)"
            )),
        };
    }

    if let Some(raw) = take_override(extra_params, &["soft-breaks-as-hard", "hard-breaks"]) {
        config.convert.soft_breaks_as_hard = parse_bool_arg("soft-breaks-as-hard", &raw);
    }

    if let Some(raw) = extra_params.remove("max-input-bytes") {
        config.convert.max_input_bytes = raw.parse().unwrap_or_else(|_| {
            fail(&format!("Invalid byte count '{raw}' for --extra-max-input-bytes"));
        });
    }
}

fn take_override(map: &mut HashMap<String, String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = map.remove(*key) {
            return Some(value);
        }
    }
    None
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => fail(&format!("Invalid boolean value '{other}' for --extra-{flag}")),
    }
}
