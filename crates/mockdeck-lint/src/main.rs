//! `mockdeck-lint`: check workspace files before handing them to the server.
//!
//! ```text
//! mockdeck-lint workspace.yaml
//! mockdeck-lint ./workspaces --format json --strict
//! ```

use clap::{Parser, ValueEnum};
use mockdeck_lint::{lint_directory, lint_file, LintIssue, LintOptions, LintResult, Severity};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mockdeck-lint", author, version, about = "Validate Mockdeck workspace files")]
struct Args {
    /// Workspace file, or a directory of `.json` / `.yaml` / `.yml` files
    path: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Hide warnings
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Fail on warnings too
    #[arg(short, long)]
    strict: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn severity(&self, severity: Severity) -> String {
        let code = match severity {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
        };
        self.paint(code, severity.label())
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let options = LintOptions {
        verbose: args.verbose,
    };

    let result = if args.path.is_dir() {
        lint_directory(&args.path, &options)
    } else {
        lint_file(&args.path, &options)
    };

    match args.format {
        Format::Json => match serde_json::to_string_pretty(&result) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                eprintln!("failed to serialize lint results: {e}");
                return ExitCode::from(2);
            }
        },
        Format::Text => {
            let palette = Palette {
                enabled: !args.no_color && std::io::stdout().is_terminal(),
            };
            print_text(&result, &args, &palette);
        }
    }

    if result.has_errors() || (args.strict && result.warnings > 0) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_text(result: &LintResult, args: &Args, palette: &Palette) {
    let mut issues: Vec<&LintIssue> = result
        .issues
        .iter()
        .filter(|i| !args.errors_only || i.severity == Severity::Error)
        .collect();
    issues.sort_by(|a, b| a.file.cmp(&b.file).then(a.severity.cmp(&b.severity)));

    for issue in issues {
        let location = issue
            .location
            .as_deref()
            .map(|l| format!(" {}", palette.paint("36", l)))
            .unwrap_or_default();
        println!(
            "{}: {}[{}]{location}: {}",
            issue.file.display(),
            palette.severity(issue.severity),
            issue.code,
            issue.message
        );
        if let Some(suggestion) = &issue.suggestion {
            println!("    {} {suggestion}", palette.paint("32", "help:"));
        }
    }

    if result.files_checked == 0 {
        println!(
            "{} no workspace files found in {}",
            palette.severity(Severity::Warning),
            args.path.display()
        );
        return;
    }

    let verdict = if result.has_errors() {
        palette.paint("1;31", "FAILED")
    } else if result.warnings > 0 {
        palette.paint("1;33", "PASSED with warnings")
    } else {
        palette.paint("1;32", "PASSED")
    };
    println!(
        "\n{verdict}: {} file(s), {} error(s), {} warning(s)",
        result.files_checked, result.errors, result.warnings
    );
}
