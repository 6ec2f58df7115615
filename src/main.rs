use anyhow::Context;
use clap::Parser;
use tailwind_config::{handle_pipe_command, logging, run_check, run_init, run_scan, run_show, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.quiet).context("Failed to initialize logging")?;

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;

    match cli.command {
        Commands::Init(args) => {
            let path = run_init(&args, &cwd)?;
            if !cli.quiet {
                println!("Created {}", path.display());
            }
            Ok(())
        }
        Commands::Show(args) => {
            print!("{}", run_show(&args, &cwd)?);
            Ok(())
        }
        Commands::Check(args) => {
            let (path, report) = run_check(&args, &cwd)?;
            for issue in &report.issues {
                eprintln!("{}", issue);
            }
            if !report.is_valid() {
                eprintln!("{}: {} error(s)", path.display(), report.errors().count());
                std::process::exit(1);
            }
            if !cli.quiet {
                println!("{}: ok", path.display());
            }
            Ok(())
        }
        Commands::Scan(mut args) => {
            // Progress output would interleave with log lines
            args.no_progress |= cli.verbose > 0 || cli.quiet;

            match run_scan(&args, &cwd) {
                Ok(outcome) => {
                    if !cli.quiet {
                        println!("Scan successful!");
                        println!(
                            "  - Processed {} files ({} unchanged)",
                            outcome.files_scanned + outcome.files_reused,
                            outcome.files_reused
                        );
                        println!("  - Found {} unique classes", outcome.manifest.classes.len());
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Pipe(args) => {
            handle_pipe_command(args).await?;
            Ok(())
        }
    }
}
