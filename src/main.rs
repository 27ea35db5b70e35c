use clap::Parser;
use seqlab_jobs::cleaning::CleaningParams;
use seqlab_jobs::cli::{self, Commands};
use seqlab_jobs::commands::{self, RunOptions};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = cli::Args::parse();
    let options = RunOptions {
        config: args.config,
        results_dir: args.results_dir,
        quiet: args.quiet,
    };

    let result = match args.command {
        Commands::Qc { file1, file2 } => commands::qc::run(&options, file1, file2),
        Commands::Clean {
            file,
            adapter,
            quality_threshold,
            min_length,
            max_length,
            max_n_percent,
            deduplicate,
            filter_complexity,
        } => commands::clean::run(
            &options,
            file,
            CleaningParams {
                adapter,
                quality_threshold,
                min_length,
                max_length,
                max_n_percent,
                deduplicate,
                filter_complexity,
            },
        ),
        Commands::Align {
            reference,
            reads1,
            reads2,
            variant_calling,
            min_mapping_quality,
        } => commands::align::run(
            &options,
            reference,
            reads1,
            reads2,
            variant_calling,
            min_mapping_quality,
        ),
        Commands::Batch { manifest } => commands::batch::run(&options, manifest),
        Commands::Config { save } => commands::config::run(&options, save),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
