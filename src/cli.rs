// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Command-line interface definitions using clap.
//!
//! Defines the CLI structure for zigcheck with check, install-hooks,
//! completions, and setup subcommands. Uses clap derive macros for
//! argument parsing.

use clap::{Parser, Subcommand, ValueEnum};

use crate::{checker::AnalysisMode, report::OutputFormat};

/// Static analyzer for Zig memory-management and testing compliance.
#[derive(Parser, Debug)]
#[command(name = "zigcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze Zig sources without modifying files
    Check {
        /// Paths to analyze (default: current directory)
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Which analyzers to run
        #[arg(short, long, value_enum, default_value_t = Mode::All)]
        mode: Mode,

        /// Output format (default: text, or the configured format)
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Exit non-zero when warnings are found
        #[arg(long)]
        fail_on_warnings: bool,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,

        /// List skipped and failed files too
        #[arg(short, long)]
        verbose: bool,

        /// Enable colored output
        #[arg(long)]
        color: bool
    },

    /// Install a git pre-commit hook running zigcheck
    InstallHooks {
        /// Repository root (default: current directory)
        #[arg(default_value = ".")]
        path: String
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell
    },

    /// Setup shell completions automatically
    Setup
}

/// Analyzer selection for the check command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Memory analysis only
    Memory,
    /// Testing compliance only
    Tests,
    /// Both analyzers
    All
}

impl From<Mode> for AnalysisMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Memory => Self::Memory,
            Mode::Tests => Self::Tests,
            Mode::All => Self::All
        }
    }
}

/// Output format flag for the check command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// JSON document
    Json,
    /// GitHub Actions annotations
    GithubActions
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => Self::Text,
            Format::Json => Self::Json,
            Format::GithubActions => Self::GithubActions
        }
    }
}

/// Supported shells for completion generation
#[derive(Debug, Clone, Copy, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Fish,
    Zsh,
    PowerShell,
    Elvish
}

impl Cli {
    /// Parse command-line arguments.
    ///
    /// # Returns
    ///
    /// Parsed `Cli` with selected subcommand
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_check_defaults() {
        let cli = Cli::parse_from(["zigcheck", "check"]);
        match cli.command {
            Command::Check {
                paths,
                mode,
                format,
                fail_on_warnings,
                config,
                verbose,
                color
            } => {
                assert_eq!(paths, vec!["."]);
                assert_eq!(mode, Mode::All);
                assert!(format.is_none());
                assert!(!fail_on_warnings);
                assert!(config.is_none());
                assert!(!verbose);
                assert!(!color);
            }
            _ => panic!("Expected Check command")
        }
    }

    #[test]
    fn test_cli_parsing_check_paths() {
        let cli = Cli::parse_from(["zigcheck", "check", "src", "lib"]);
        match cli.command {
            Command::Check {
                paths, ..
            } => {
                assert_eq!(paths, vec!["src", "lib"]);
            }
            _ => panic!("Expected Check command")
        }
    }

    #[test]
    fn test_cli_parsing_check_mode() {
        let cli = Cli::parse_from(["zigcheck", "check", "--mode", "memory"]);
        match cli.command {
            Command::Check {
                mode, ..
            } => {
                assert_eq!(mode, Mode::Memory);
            }
            _ => panic!("Expected Check command")
        }
    }

    #[test]
    fn test_cli_parsing_check_format() {
        let cli = Cli::parse_from(["zigcheck", "check", "--format", "github-actions"]);
        match cli.command {
            Command::Check {
                format, ..
            } => {
                assert_eq!(format, Some(Format::GithubActions));
            }
            _ => panic!("Expected Check command")
        }
    }

    #[test]
    fn test_cli_parsing_fail_on_warnings() {
        let cli = Cli::parse_from(["zigcheck", "check", "--fail-on-warnings"]);
        match cli.command {
            Command::Check {
                fail_on_warnings, ..
            } => {
                assert!(fail_on_warnings);
            }
            _ => panic!("Expected Check command")
        }
    }

    #[test]
    fn test_cli_parsing_check_config() {
        let cli = Cli::parse_from(["zigcheck", "check", "--config", "zigcheck.json"]);
        match cli.command {
            Command::Check {
                config, ..
            } => {
                assert_eq!(config.as_deref(), Some("zigcheck.json"));
            }
            _ => panic!("Expected Check command")
        }
    }

    #[test]
    fn test_cli_parsing_install_hooks() {
        let cli = Cli::parse_from(["zigcheck", "install-hooks"]);
        match cli.command {
            Command::InstallHooks {
                path
            } => {
                assert_eq!(path, ".");
            }
            _ => panic!("Expected InstallHooks command")
        }
    }

    #[test]
    fn test_cli_parsing_install_hooks_with_path() {
        let cli = Cli::parse_from(["zigcheck", "install-hooks", "repo/"]);
        match cli.command {
            Command::InstallHooks {
                path
            } => {
                assert_eq!(path, "repo/");
            }
            _ => panic!("Expected InstallHooks command")
        }
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::parse_from(["zigcheck", "completions", "fish"]);
        match cli.command {
            Command::Completions {
                shell
            } => match shell {
                Shell::Fish => {}
                _ => panic!("Expected Fish shell")
            },
            _ => panic!("Expected Completions command")
        }
    }

    #[test]
    fn test_cli_parsing_setup() {
        let cli = Cli::parse_from(["zigcheck", "setup"]);
        match cli.command {
            Command::Setup => {}
            _ => panic!("Expected Setup command")
        }
    }

    #[test]
    fn test_mode_conversion() {
        assert_eq!(AnalysisMode::from(Mode::Memory), AnalysisMode::Memory);
        assert_eq!(AnalysisMode::from(Mode::Tests), AnalysisMode::Tests);
        assert_eq!(AnalysisMode::from(Mode::All), AnalysisMode::All);
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(OutputFormat::from(Format::Text), OutputFormat::Text);
        assert_eq!(OutputFormat::from(Format::Json), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from(Format::GithubActions),
            OutputFormat::GithubActions
        );
    }
}
