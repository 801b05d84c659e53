use std::path::PathBuf;
use std::time::Instant;

use anyhow::Error;
use clap::Parser;
use simple_logger::SimpleLogger;

use record_file_sort::generator::{FileGenerator, GeneratorOptions};

#[derive(Parser)]
#[command(name = "generate-records")]
#[command(about = "Generate a file of random '<number>. <text>' lines")]
struct Args {
    #[arg(help = "Output file, replaced if it exists")]
    output: PathBuf,

    #[arg(short, long, help = "Desired file size in MB (1 MB = 1 000 000 bytes)")]
    size_mb: u64,

    #[arg(short, long, default_value_t = 50_000, help = "Lines per generated batch")]
    batch_size: usize,

    #[arg(short, long, default_value_t = 5, help = "Chance, in percent, of repeating an earlier line")]
    reuse_line_chance: u32,

    #[arg(short, long, default_value_t = 1000, help = "Number of unique words")]
    vocabulary_length: usize,

    #[arg(long, help = "Seed for reproducible output")]
    seed: Option<u64>,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    SimpleLogger::new().with_level(log::LevelFilter::Info).init()?;

    let mut options = GeneratorOptions::new(args.size_mb * 1_000_000)
        .with_batch_size(args.batch_size)
        .with_reuse_line_chance(args.reuse_line_chance)
        .with_vocabulary_length(args.vocabulary_length);
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }

    let start = Instant::now();
    let mut generator = FileGenerator::new(options)?;
    let stats = generator.create_file(&args.output)?;
    println!(
        "Total: {:.3} s, batch count: {}, write avg: {:.3} s, batch gen avg: {:.3} s, wait avg: {:.3} s.",
        start.elapsed().as_secs_f64(),
        stats.batch_count,
        stats.write_average().as_secs_f64(),
        stats.gen_average().as_secs_f64(),
        stats.wait_average().as_secs_f64(),
    );
    Ok(())
}
