use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the directory job results are written to
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    /// Hide the progress spinner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Quality-control report for one FASTQ file, or a comparison of two
    Qc {
        /// FASTQ file, optionally gzip compressed
        file1: PathBuf,
        /// Second FASTQ file to compare against the first
        file2: Option<PathBuf>,
    },

    /// Trim and filter reads from a FASTQ file
    Clean {
        /// FASTQ file, optionally gzip compressed
        file: PathBuf,
        /// Adapter sequence; reads are cut at its first occurrence
        #[arg(long, default_value = "")]
        adapter: String,
        /// Minimum mean Phred score of a 4-base window (default: 20)
        #[arg(long, default_value = "20")]
        quality_threshold: u8,
        /// Minimum read length after trimming (default: 50)
        #[arg(long, default_value = "50")]
        min_length: usize,
        /// Maximum read length after trimming (default: 150)
        #[arg(long, default_value = "150")]
        max_length: usize,
        /// Maximum percentage of N bases (default: 10)
        #[arg(long, default_value = "10")]
        max_n_percent: f64,
        /// Drop exact duplicate sequences after the first copy
        #[arg(long)]
        deduplicate: bool,
        /// Drop low-complexity reads
        #[arg(long)]
        filter_complexity: bool,
    },

    /// Align reads to a reference and optionally call variants
    Align {
        /// Reference FASTA
        reference: PathBuf,
        /// Reads, or first mates of a pair
        reads1: PathBuf,
        /// Second mates of a pair
        reads2: Option<PathBuf>,
        /// Call variants when the alignment rate passes the gate
        #[arg(long)]
        variant_calling: bool,
        /// Minimum mapping quality kept in the filtered alignment (default: 0)
        #[arg(long, default_value = "0")]
        min_mapping_quality: u8,
    },

    /// Run every job in a JSON manifest on the worker pool
    Batch {
        /// JSON array of job descriptors
        manifest: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the user config directory
        #[arg(long)]
        save: bool,
    },
}
