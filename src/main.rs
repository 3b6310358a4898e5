//! FastConvert2Bed CLI entry point
//!
//! One subcommand per source format. Output goes to stdout, sorted by
//! `sort-bed` unless `--do-not-sort` is given.

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use fast_convert2bed::core::{
    sysexits, ConvertError, InputSource, PipelineFlags, PipelineOptions, StarchFormat,
};
use fast_convert2bed::formats::{
    GffMapper, GffOptions, PslMapper, PslOptions, SamMapper, SamOptions, TagPolicy,
    VariantFilter, VcfMapper, VcfOptions,
};
use fast_convert2bed::pipeline::{PipelineReport, StreamPipeline};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fast-convert2bed")]
#[command(about = "Convert SAM/BAM, GFF3, PSL and VCF records to sorted extended BED")]
#[command(version)]
#[command(author = "FastConvert2Bed Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every converter
#[derive(Args)]
struct PipelineArgs {
    /// Input file (stdin if not specified; gzip and bzip2 are detected)
    input: Option<PathBuf>,
    /// Print BED in input order instead of piping through sort-bed
    #[arg(short = 'd', long)]
    do_not_sort: bool,
    /// Memory limit for sort-bed, e.g. 512M or 2G (default: 2G)
    #[arg(short = 'm', long, value_name = "VALUE")]
    max_mem: Option<String>,
    /// Directory for sort-bed temporary data (needs --max-mem)
    #[arg(short = 'r', long, value_name = "DIR")]
    sort_tmpdir: Option<PathBuf>,
    /// Compress output into a Starch archive
    #[arg(long)]
    starch: bool,
    /// Starch backend compression (default: bzip2)
    #[arg(long, value_name = "FORMAT")]
    starch_format: Option<StarchFormat>,
    /// Number of threads for record mapping
    #[arg(short = 't', long, default_value = "1")]
    threads: usize,
}

impl PipelineArgs {
    fn into_pipeline(self) -> Result<StreamPipeline, ConvertError> {
        let options = PipelineOptions::from_flags(PipelineFlags {
            do_not_sort: self.do_not_sort,
            max_mem: self.max_mem,
            sort_tmpdir: self.sort_tmpdir,
            starch: self.starch,
            starch_format: self.starch_format,
            threads: self.threads,
        })?;
        let input = self.input.map(InputSource::File).unwrap_or_default();
        Ok(StreamPipeline::new(options, input))
    }
}

/// SAM and BAM options
#[derive(Args)]
struct AlignmentArgs {
    /// Include unmapped reads
    #[arg(short = 'a', long)]
    all_reads: bool,
    /// Split reads with N or D CIGAR operations into separate BED records
    #[arg(short = 's', long)]
    split: bool,
    /// Comma-separated list of extra optional-field keys to accept
    #[arg(long, value_name = "CSV")]
    custom_tags: Option<String>,
    /// Keep @ header lines as _header pseudo-records
    #[arg(short = 'k', long)]
    keep_header: bool,
}

impl AlignmentArgs {
    fn options(&self) -> SamOptions {
        SamOptions {
            keep_header: self.keep_header,
            split: self.split,
            all_reads: self.all_reads,
            tags: TagPolicy::from_csv(self.custom_tags.as_deref()),
        }
    }
}

/// Mutually exclusive VCF variant filters
#[derive(Args)]
#[group(required = false, multiple = false)]
struct VariantArgs {
    /// Only single nucleotide variants
    #[arg(long)]
    snvs: bool,
    /// Only insertions
    #[arg(long)]
    insertions: bool,
    /// Only deletions
    #[arg(long)]
    deletions: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert SAM to BED
    Sam {
        #[command(flatten)]
        alignment: AlignmentArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Convert BAM to BED (decoded with samtools)
    Bam {
        #[command(flatten)]
        alignment: AlignmentArgs,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Convert GFF3 to BED
    Gff {
        /// Keep # and ## lines as _header pseudo-records
        #[arg(short = 'k', long)]
        keep_header: bool,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Convert PSL to BED
    Psl {
        /// Input starts with the 5-line psLayout header
        #[arg(long)]
        headered: bool,
        /// Keep header lines as _header pseudo-records (needs --headered)
        #[arg(short = 'k', long)]
        keep_header: bool,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Convert VCF to BED
    Vcf {
        #[command(flatten)]
        variants: VariantArgs,
        /// Keep ## metadata and the #CHROM line as _header pseudo-records
        #[arg(short = 'k', long)]
        keep_header: bool,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

fn alignment_pipeline(
    alignment: &AlignmentArgs,
    pipeline: PipelineArgs,
) -> Result<StreamPipeline, ConvertError> {
    if alignment.split && pipeline.do_not_sort {
        return Err(ConvertError::Usage(
            "Cannot specify both --split and --do-not-sort parameters".into(),
        ));
    }
    pipeline.into_pipeline()
}

fn run(command: Commands) -> anyhow::Result<PipelineReport> {
    let report = match command {
        Commands::Sam { alignment, pipeline } => {
            let pipeline = alignment_pipeline(&alignment, pipeline)?;
            pipeline.run(SamMapper::new(alignment.options()))?
        }
        Commands::Bam { alignment, pipeline } => {
            let pipeline = alignment_pipeline(&alignment, pipeline)?.bam_input();
            pipeline.run(SamMapper::new(alignment.options()))?
        }
        Commands::Gff { keep_header, pipeline } => pipeline
            .into_pipeline()?
            .run(GffMapper::new(GffOptions { keep_header }))?,
        Commands::Psl { headered, keep_header, pipeline } => pipeline
            .into_pipeline()?
            .run(PslMapper::new(PslOptions { keep_header, headered }))?,
        Commands::Vcf { variants, keep_header, pipeline } => {
            let filter =
                VariantFilter::from_flags(variants.snvs, variants.insertions, variants.deletions)?;
            pipeline
                .into_pipeline()?
                .run(VcfMapper::new(VcfOptions { keep_header, filter }))?
        }
    };
    Ok(report)
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => sysexits::EX_OK,
                _ => sysexits::EX_USAGE,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let start = Instant::now();
    match run(cli.command) {
        Ok(report) => {
            info!(
                "{} line(s) read in {:.2}s",
                report.stats.lines,
                start.elapsed().as_secs_f64()
            );
            ExitCode::from(sysexits::EX_OK)
        }
        Err(err) => {
            eprintln!("[fast-convert2bed] - Error: {}", err);
            let code = err
                .downcast_ref::<ConvertError>()
                .map(ConvertError::exit_code)
                .unwrap_or(sysexits::EX_SOFTWARE);
            ExitCode::from(code)
        }
    }
}
