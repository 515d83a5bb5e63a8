use addrex::{
    init_tracing, AddressExtractor, Cli, ExtractionSummary, ExtractorError, OutputFormatter,
    OutputMode, UserFriendlyError,
};
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    // Handle special commands first
    if cli.usage {
        print!("{}", Cli::usage());
        return 0;
    }

    if cli.version {
        println!("{}", Cli::version_line());
        return 0;
    }

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    init_tracing(cli.quiet);

    let extractor = match AddressExtractor::from_cli(&cli) {
        Ok(extractor) => extractor,
        Err(e) => {
            print_startup_error(&e, cli.output_mode());
            return exit_code_for(&e);
        }
    };

    match extractor.extract(&cli.inputs).await {
        Ok(summary) => {
            if summary.cancelled {
                extractor.handle_error(&ExtractorError::Cancelled);
            } else if summary.files_failed > 0 {
                extractor.output_formatter().warning(&format!(
                    "{} file(s) could not be read, see {}",
                    summary.files_failed,
                    summary.report_file.display()
                ));
            }
            exit_code_for_summary(&summary, cli.strict)
        }
        Err(e) => {
            extractor.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for_summary(summary: &ExtractionSummary, strict: bool) -> i32 {
    if summary.cancelled {
        130
    } else if strict && summary.files_failed > 0 {
        3 // Completed, but some files could not be read
    } else {
        0
    }
}

fn exit_code_for(error: &ExtractorError) -> i32 {
    match error {
        ExtractorError::Cancelled => 130, // Interrupted (SIGINT)
        ExtractorError::Argument { .. } => 2,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "addrex.toml".to_string());

    match AddressExtractor::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  addrex <input>... --config {}", config_path);
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &ExtractorError, mode: OutputMode) {
    let formatter = OutputFormatter::new(mode, false);
    formatter.print_user_friendly_error(error);
}
