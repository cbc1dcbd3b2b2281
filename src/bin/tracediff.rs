use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::{Context, Result};

use tracediff::{
    comparison_json, compare_files, normalize_file, normalize_to, parse_line, print_comparison,
    view, LineMatch, NormalizeOptions, ParseOptions, DEFAULT_ACTUAL, DEFAULT_EXPECTED,
};

/// tracediff – golden-log checker for CPU instruction traces
#[derive(Parser)]
#[command(name = "tracediff", version, about = "Compare and normalize CPU trace logs", arg_required_else_help = true)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reports the first line where two logs differ
    Compare {
        /// Reference log
        #[arg(default_value = DEFAULT_EXPECTED)]
        expected: PathBuf,

        /// Emulator output
        #[arg(default_value = DEFAULT_ACTUAL)]
        actual: PathBuf,

        /// Canonicalize the expected log in place before comparing
        #[arg(long)]
        normalize_expected: bool,

        /// With --normalize-expected: fail on lines that aren't trace records
        #[arg(long)]
        strict: bool,

        /// Accept lowercase hex digits in trace records
        #[arg(long)]
        lowercase: bool,

        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrites a raw trace as `PPPP A:AA X:XX Y:YY P:PP S:SS` lines
    Normalize {
        /// Trace to canonicalize
        file: PathBuf,

        /// Write here instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail on lines that aren't trace records
        #[arg(long)]
        strict: bool,

        /// Accept lowercase hex digits
        #[arg(long)]
        lowercase: bool,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Side-by-side interactive view of two logs
    View {
        /// Reference log
        #[arg(default_value = DEFAULT_EXPECTED)]
        expected: PathBuf,

        /// Emulator output
        #[arg(default_value = DEFAULT_ACTUAL)]
        actual: PathBuf,
    },

    /// Shows the trace record extracted from a single line
    Parse {
        line: String,

        /// Accept lowercase hex digits
        #[arg(long)]
        lowercase: bool,

        /// Emit as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracediff::logging::init(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

/// Exit status: 0 clean, 1 divergence or no record, 2 error.
fn run(cli: Cli) -> Result<u8> {
    match cli.cmd {
        Command::Compare { expected, actual, normalize_expected, strict, lowercase, json } => {
            let parse = ParseOptions { allow_lowercase: lowercase };

            if normalize_expected {
                normalize_file(&expected, &NormalizeOptions { parse, strict })
                    .with_context(|| format!("Failed to normalize {:?}", expected))?;
            }

            let result = compare_files(&expected, &actual)
                .with_context(|| format!("Comparing {:?} with {:?}", expected, actual))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&comparison_json(&result, &parse)?)?);
            } else {
                print_comparison(&result, &parse, cli.verbose > 0);
            }

            Ok(if result.is_identical() { 0 } else { 1 })
        }

        Command::Normalize { file, output, strict, lowercase, json } => {
            let opts = NormalizeOptions { parse: ParseOptions { allow_lowercase: lowercase }, strict };
            let target = output.as_ref().unwrap_or(&file);

            let summary = match &output {
                Some(out) => normalize_to(&file, out, &opts),
                None => normalize_file(&file, &opts),
            }
            .with_context(|| format!("Failed to normalize {:?}", file))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{}",
                    format!("Kept {} records, dropped {} lines → {:?}", summary.kept, summary.dropped, target).green()
                );
            }
            Ok(0)
        }

        Command::View { expected, actual } => {
            view(&expected, &actual)
                .with_context(|| format!("Viewing {:?} against {:?}", expected, actual))?;
            Ok(0)
        }

        Command::Parse { line, lowercase, json } => {
            let m = parse_line(&line, &ParseOptions { allow_lowercase: lowercase });
            match (m, json) {
                (LineMatch::Matched(rec), true) => println!("{}", serde_json::to_string_pretty(&rec)?),
                (LineMatch::Matched(rec), false) => println!("{}", rec),
                (LineMatch::Unmatched, true) => println!("null"),
                (LineMatch::Unmatched, false) => println!("{}", "no trace record".yellow()),
            }
            Ok(if matches!(m, LineMatch::Matched(_)) { 0 } else { 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_compare_defaults() {
        let cli = Cli::parse_from(["tracediff", "compare"]);
        match cli.cmd {
            Command::Compare { expected, actual, normalize_expected, json, .. } => {
                assert_eq!(expected, PathBuf::from(DEFAULT_EXPECTED));
                assert_eq!(actual, PathBuf::from(DEFAULT_ACTUAL));
                assert!(!normalize_expected);
                assert!(!json);
            },
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_cli_compare_with_paths() {
        let args = ["tracediff", "-vv", "compare", "a.log", "b.log", "--normalize-expected", "--strict"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Command::Compare { expected, actual, normalize_expected, strict, .. } => {
                assert_eq!(expected, PathBuf::from("a.log"));
                assert_eq!(actual, PathBuf::from("b.log"));
                assert!(normalize_expected);
                assert!(strict);
            },
            _ => panic!("Expected Compare command"),
        }
    }

    #[test]
    fn test_cli_normalize_command() {
        let args = ["tracediff", "normalize", "raw.log", "--output", "canon.log", "--lowercase"];
        let cli = Cli::parse_from(args);
        match cli.cmd {
            Command::Normalize { file, output, strict, lowercase, json } => {
                assert_eq!(file, PathBuf::from("raw.log"));
                assert_eq!(output, Some(PathBuf::from("canon.log")));
                assert!(!strict);
                assert!(lowercase);
                assert!(!json);
            },
            _ => panic!("Expected Normalize command"),
        }
    }

    #[test]
    fn test_cli_parse_command() {
        let cli = Cli::parse_from(["tracediff", "parse", "C000 A:00 X:00 Y:00 P:24 SP:FD", "--json"]);
        match cli.cmd {
            Command::Parse { line, json, .. } => {
                assert!(line.starts_with("C000"));
                assert!(json);
            },
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_cli_view_command() {
        let cli = Cli::parse_from(["tracediff", "view", "a.log"]);
        match cli.cmd {
            Command::View { expected, actual } => {
                assert_eq!(expected, PathBuf::from("a.log"));
                assert_eq!(actual, PathBuf::from(DEFAULT_ACTUAL));
            },
            _ => panic!("Expected View command"),
        }
    }

    #[test]
    fn test_cli_view_missing_file_is_an_error() {
        let cli = Cli::parse_from(["tracediff", "view", "/nonexistent/a.log", "/nonexistent/b.log"]);
        assert!(run(cli).is_err());
    }

    #[test]
    fn test_cli_parse_exit_codes_agree() {
        let line = "C000 A:00 X:00 Y:00 P:24 SP:FD";
        assert_eq!(run(Cli::parse_from(["tracediff", "parse", line])).unwrap(), 0);
        assert_eq!(run(Cli::parse_from(["tracediff", "parse", line, "--json"])).unwrap(), 0);
        assert_eq!(run(Cli::parse_from(["tracediff", "parse", "garbage"])).unwrap(), 1);
        assert_eq!(run(Cli::parse_from(["tracediff", "parse", "garbage", "--json"])).unwrap(), 1);
    }

    #[test]
    fn test_cli_compare_exit_codes() {
        use std::io::Write;
        let mut a = tempfile::NamedTempFile::new().unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        writeln!(a, "C000 A:00 X:00 Y:00 P:24 SP:FD").unwrap();
        writeln!(b, "C000 A:00 X:00 Y:00 P:24 SP:FD").unwrap();

        let path = |f: &tempfile::NamedTempFile| f.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from(["tracediff".to_string(), "compare".into(), path(&a), path(&b)]);
        assert_eq!(run(cli).unwrap(), 0);

        writeln!(b, "extra line is outside the compared range").unwrap();
        let cli = Cli::parse_from(["tracediff".to_string(), "compare".into(), path(&a), path(&b)]);
        assert_eq!(run(cli).unwrap(), 0);

        let mut c = tempfile::NamedTempFile::new().unwrap();
        writeln!(c, "C000 A:01 X:00 Y:00 P:24 SP:FD").unwrap();
        let cli = Cli::parse_from(["tracediff".to_string(), "compare".into(), path(&a), path(&c)]);
        assert_eq!(run(cli).unwrap(), 1);
    }

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
