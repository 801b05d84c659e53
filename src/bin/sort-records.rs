use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Error;
use clap::Parser;
use simple_logger::SimpleLogger;

use record_file_sort::merge_selection::MergeSelection;
use record_file_sort::sort::Sort;

#[derive(Parser)]
#[command(name = "sort-records")]
#[command(about = "Sort a file of '<number>. <text>' lines by text, then by number")]
struct Args {
    #[arg(help = "Input file")]
    input: PathBuf,

    #[arg(short, long, help = "Output file, defaults to <input stem>_sorted<.ext>")]
    output: Option<PathBuf>,

    #[arg(short, long, default_value_t = 50_000, help = "Records per sorted run")]
    batch_size: usize,

    #[arg(short, long, help = "Directory for run files, defaults to the input directory")]
    tmp_dir: Option<PathBuf>,

    #[arg(long, default_value = "auto", help = "Merge selection: auto, linear or heap")]
    selection: MergeSelection,

    #[arg(long, help = "Only check whether the input is sorted")]
    check: bool,
}

fn run(args: Args) -> Result<(), Error> {
    let mut sort = Sort::new(args.input.clone());
    sort.with_max_records_per_run(args.batch_size);
    sort.with_merge_selection(args.selection);
    if let Some(output) = args.output {
        sort.with_output(output);
    }
    if let Some(tmp_dir) = args.tmp_dir {
        sort.with_tmp_dir(tmp_dir);
    }

    let start = Instant::now();
    if args.check {
        let sorted = sort.check()?;
        println!("'{}' is {}sorted, elapsed: {:.3} s.", args.input.display(), if sorted { "" } else { "not " }, start.elapsed().as_secs_f64());
    } else {
        let output = sort.sort()?;
        println!("Sorted. Output: '{}', elapsed: {:.3} s.", output.display(), start.elapsed().as_secs_f64());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = SimpleLogger::new().with_level(log::LevelFilter::Info).init() {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
