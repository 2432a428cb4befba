// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Zig static analysis tool.
//!
//! This binary provides a command-line interface for analyzing Zig
//! projects: memory-management defects (missing defer/errdefer,
//! disallowed allocators, arena teardown) and testing-compliance
//! defects (test categories and naming).
//!
//! # Available Commands
//!
//! - `zigcheck check` - Analyze sources and report issues
//! - `zigcheck install-hooks` - Install a git pre-commit hook
//! - `zigcheck completions` - Generate shell completions
//! - `zigcheck setup` - Install completions for the current shell
//!
//! # Exit Codes
//!
//! - `0` - No findings (and no warnings with `--fail-on-warnings`)
//! - `1` - Findings exceeded the threshold
//! - `2` - Usage or configuration error
//! - `3` - IO error
//!
//! # Examples
//!
//! ```bash
//! zigcheck check src/
//! zigcheck check --mode memory --format json .
//! zigcheck check --fail-on-warnings --format github-actions
//! ```

use std::{fs, path::Path, process};

use tracing_subscriber::EnvFilter;
use zigcheck::{
    checker::AnalysisMode,
    cli::{Cli, Command, Format, Mode, Shell},
    config::Config,
    hooks::install_hooks,
    project::{ProjectAnalysisResult, check_project},
    report::{OutputFormat, ReportMeta, render}
};

const EXIT_OK: i32 = 0;
const EXIT_FINDINGS: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_IO: i32 = 3;

/// Default configuration file looked up next to the working directory.
const DEFAULT_CONFIG_FILE: &str = "zigcheck.json";

fn main() {
    let cli = Cli::parse_args();

    let code = match cli.command {
        Command::Check {
            paths,
            mode,
            format,
            fail_on_warnings,
            config,
            verbose,
            color
        } => run_check(
            &paths,
            mode,
            format,
            fail_on_warnings,
            config.as_deref(),
            verbose,
            color
        ),
        Command::InstallHooks {
            path
        } => run_install_hooks(&path),
        Command::Completions {
            shell
        } => {
            generate_completions(shell);
            EXIT_OK
        }
        Command::Setup => setup_completions()
    };

    process::exit(code);
}

/// Load the effective configuration for a check run.
///
/// An explicit `--config` path must exist; the default file is used
/// only when present. Environment overrides are applied afterwards.
fn load_config(explicit: Option<&str>) -> Result<Config, String> {
    let mut config = match explicit {
        Some(path) => Config::load(Path::new(path)).map_err(|e| e.to_string())?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                Config::load(default).map_err(|e| e.to_string())?
            } else {
                Config::default()
            }
        }
    };

    config.apply_env();
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Install the tracing subscriber per the logging configuration.
fn init_logging(config: &Config) {
    let filter = EnvFilter::new(format!("zigcheck={}", config.logging.level));

    match &config.logging.log_path {
        Some(path) => match fs::File::create(path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .try_init()
                    .ok();
            }
            Err(err) => {
                eprintln!("cannot open log file {}: {}", path, err);
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .try_init()
                    .ok();
            }
        },
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
        }
    }
}

/// Resolve the output format from flag, config, then default.
fn resolve_format(flag: Option<Format>, config: &Config) -> Result<OutputFormat, String> {
    if let Some(format) = flag {
        return Ok(format.into());
    }
    match &config.options.output_format {
        Some(name) => OutputFormat::parse(name)
            .ok_or_else(|| format!("unknown output format in configuration: {}", name)),
        None => Ok(OutputFormat::Text)
    }
}

/// Run the check command over every requested path.
///
/// # Arguments
///
/// * `paths` - Roots to scan
/// * `mode` - Analyzer selection
/// * `format` - Output format flag
/// * `fail_on_warnings` - Treat warnings as findings
/// * `config_path` - Explicit configuration file
/// * `verbose` - List skipped and failed files, report progress
/// * `color` - Colorize text output
///
/// # Returns
///
/// Process exit code
fn run_check(
    paths: &[String],
    mode: Mode,
    format: Option<Format>,
    fail_on_warnings: bool,
    config_path: Option<&str>,
    verbose: bool,
    color: bool
) -> i32 {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("configuration error: {}", message);
            return EXIT_USAGE;
        }
    };

    init_logging(&config);

    let output_format = match resolve_format(format, &config) {
        Ok(format) => format,
        Err(message) => {
            eprintln!("configuration error: {}", message);
            return EXIT_USAGE;
        }
    };

    let analysis_mode = AnalysisMode::from(mode);
    let mut combined = ProjectAnalysisResult::default();

    for path in paths {
        let mut progress = |done: usize, total: usize, file: &Path| {
            if verbose {
                eprintln!("[{}/{}] {}", done + 1, total, file.display());
            }
        };

        let result = check_project(
            Path::new(path),
            &config,
            analysis_mode,
            Some(&mut progress)
        );

        match result {
            Ok(part) => {
                combined.issues.extend(part.issues);
                combined.files_analyzed += part.files_analyzed;
                combined.analysis_time_ms += part.analysis_time_ms;
                combined.failed_files.extend(part.failed_files);
                combined.skipped_files.extend(part.skipped_files);
            }
            Err(err) => {
                eprintln!("error scanning {}: {}", path, err);
                return EXIT_IO;
            }
        }
    }

    combined.issues_found = combined.issues.len();

    let meta = ReportMeta::of_project(&combined);
    print!("{}", render(&combined.issues, &meta, output_format, color));

    if verbose && output_format == OutputFormat::Text {
        for skipped in &combined.skipped_files {
            println!("skipped: {}", skipped);
        }
        for failed in &combined.failed_files {
            println!("failed: {}", failed);
        }
    }

    if combined.has_errors() || (fail_on_warnings && combined.has_warnings()) {
        EXIT_FINDINGS
    } else if !combined.failed_files.is_empty() {
        EXIT_IO
    } else {
        EXIT_OK
    }
}

/// Run the install-hooks command.
fn run_install_hooks(path: &str) -> i32 {
    match install_hooks(path) {
        Ok(hook_path) => {
            println!("pre-commit hook installed: {}", hook_path);
            EXIT_OK
        }
        Err(err) => {
            eprintln!("cannot install hooks: {}", err);
            EXIT_USAGE
        }
    }
}

/// Generate shell completions to stdout.
///
/// # Arguments
///
/// * `shell` - Target shell for completion generation
fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    use clap_complete::{Shell as CompShell, generate};

    let mut cmd = Cli::command();
    let bin_name = "zigcheck";

    let comp_shell = match shell {
        Shell::Bash => CompShell::Bash,
        Shell::Fish => CompShell::Fish,
        Shell::Zsh => CompShell::Zsh,
        Shell::PowerShell => CompShell::PowerShell,
        Shell::Elvish => CompShell::Elvish
    };

    generate(comp_shell, &mut cmd, bin_name, &mut std::io::stdout());
}

/// Setup shell completions automatically.
///
/// Detects the current shell and installs completions to its standard
/// location.
fn setup_completions() -> i32 {
    let shell_name = detect_shell();

    let Some((shell, comp_dir, file_name)) = completion_config(&shell_name) else {
        eprintln!("unsupported shell: {}", shell_name);
        eprintln!("supported shells: bash, fish, zsh");
        eprintln!("manual installation: zigcheck completions <shell> > <completion-file>");
        return EXIT_USAGE;
    };

    if let Err(err) = fs::create_dir_all(&comp_dir) {
        eprintln!("cannot create {}: {}", comp_dir.display(), err);
        return EXIT_IO;
    }

    let comp_file = comp_dir.join(file_name);
    let file = match fs::File::create(&comp_file) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot write {}: {}", comp_file.display(), err);
            return EXIT_IO;
        }
    };

    {
        use clap::CommandFactory;
        use clap_complete::{Shell as CompShell, generate};

        let mut cmd = Cli::command();
        let comp_shell = match shell {
            Shell::Bash => CompShell::Bash,
            Shell::Fish => CompShell::Fish,
            Shell::Zsh => CompShell::Zsh,
            Shell::PowerShell => CompShell::PowerShell,
            Shell::Elvish => CompShell::Elvish
        };
        let mut file = file;
        generate(comp_shell, &mut cmd, "zigcheck", &mut file);
    }

    println!("{} completions installed to: {}", shell_name, comp_file.display());
    println!("completions will be available in new {} sessions", shell_name);
    EXIT_OK
}

/// Detects current shell from the SHELL environment variable.
///
/// # Returns
///
/// Shell name (e.g., "bash", "fish", "zsh")
#[inline]
fn detect_shell() -> String {
    use std::env;

    let shell_path = env::var("SHELL").unwrap_or_else(|_| String::from("/bin/sh"));
    Path::new(&shell_path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("sh")
        .to_string()
}

/// Gets HOME directory path.
#[inline]
fn home_dir() -> String {
    use std::env;

    env::var("HOME").unwrap_or_else(|_| String::from("~"))
}

/// Gets XDG_CONFIG_HOME, falling back to ~/.config.
#[inline]
fn xdg_config_home() -> std::path::PathBuf {
    use std::env;

    env::var("XDG_CONFIG_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from(home_dir()).join(".config"))
}

/// Gets XDG_DATA_HOME, falling back to ~/.local/share.
#[inline]
fn xdg_data_home() -> std::path::PathBuf {
    use std::env;

    env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            std::path::PathBuf::from(home_dir())
                .join(".local")
                .join("share")
        })
}

/// Completion install location for a shell.
///
/// Returns None for unsupported shells.
///
/// # Arguments
///
/// * `shell_name` - Shell name (e.g., "bash", "fish", "zsh")
fn completion_config(shell_name: &str) -> Option<(Shell, std::path::PathBuf, &'static str)> {
    match shell_name {
        "fish" => {
            let dir = xdg_config_home().join("fish").join("completions");
            Some((Shell::Fish, dir, "zigcheck.fish"))
        }
        "bash" => {
            let dir = xdg_data_home().join("bash-completion").join("completions");
            Some((Shell::Bash, dir, "zigcheck"))
        }
        "zsh" => {
            let dir = xdg_data_home().join("zsh").join("site-functions");
            Some((Shell::Zsh, dir, "_zigcheck"))
        }
        _ => None
    }
}
