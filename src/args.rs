use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tailwind configuration CLI - author, check and scan tailwind.config files
#[derive(Parser, Debug)]
#[command(name = "tailwind-config")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default configuration file
    Init(InitArgs),
    /// Print the normalized configuration
    Show(ShowArgs),
    /// Validate the configuration
    Check(CheckArgs),
    /// Scan content files for class candidates and write a manifest
    Scan(ScanArgs),
    /// Read source text from stdin and print its class candidates
    Pipe(PipeArgs),
}

/// Format a configuration is written in
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// CommonJS module (tailwind.config.js)
    #[default]
    Js,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn default_file_name(&self) -> &'static str {
        match self {
            OutputFormat::Js => "tailwind.config.js",
            OutputFormat::Json => "tailwind.config.json",
            OutputFormat::Yaml => "tailwind.config.yaml",
        }
    }
}

/// Arguments for the init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Js,
        help = "Format of the generated configuration file"
    )]
    pub format: OutputFormat,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help = "Where to write the file (defaults to tailwind.config.<ext> in the current directory)"
    )]
    pub output: Option<PathBuf>,

    #[arg(long = "force", default_value_t = false, help = "Overwrite an existing file")]
    pub force: bool,
}

/// Arguments for the show command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        env = "TAILWIND_CONFIG",
        help = "Configuration file (discovered in the current directory when omitted)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Js,
        help = "Output format"
    )]
    pub format: OutputFormat,
}

/// Arguments for the check command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        env = "TAILWIND_CONFIG",
        help = "Configuration file (discovered in the current directory when omitted)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "resolve-plugins",
        default_value_t = false,
        help = "Also check that every plugin module can be found in node_modules"
    )]
    pub resolve_plugins: bool,
}

/// Arguments for the scan command
#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        env = "TAILWIND_CONFIG",
        help = "Configuration file (discovered in the current directory when omitted)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'm',
        long = "manifest",
        value_name = "PATH",
        default_value = "tailwind-manifest.json",
        help = "Path where the JSON manifest will be written"
    )]
    pub manifest: PathBuf,

    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "NUM",
        help = "Number of parallel threads to use (defaults to number of CPU cores)"
    )]
    pub jobs: Option<usize>,

    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns to exclude from scanning"
    )]
    pub exclude: Vec<String>,

    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Scan but don't write the manifest"
    )]
    pub dry_run: bool,

    #[arg(
        long = "compact",
        default_value_t = false,
        help = "Write the manifest without indentation"
    )]
    pub compact: bool,

    #[arg(
        long = "no-progress",
        default_value_t = false,
        help = "Disable the progress bar"
    )]
    pub no_progress: bool,
}

/// Arguments for the pipe command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    #[arg(
        short = 'x',
        long = "extension",
        value_name = "EXT",
        default_value = "rs",
        help = "Treat stdin as a file with this extension (rs, html, css, js, tsx, ...)"
    )]
    pub extension: String,
}

impl ScanArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err("Number of jobs must be at least 1".to_string());
            }
        }

        if self.config.as_ref() == Some(&self.manifest) {
            return Err("Manifest path must differ from the configuration path".to_string());
        }

        if self.exclude.iter().any(|e| e.trim().is_empty()) {
            return Err("Exclude patterns must not be empty".to_string());
        }

        Ok(())
    }
}
