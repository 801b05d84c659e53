use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use record_file_sort::cancellation::Cancellation;
use record_file_sort::error::{ParseRecordError, SortError};
use record_file_sort::generator::{FileGenerator, GeneratorOptions};
use record_file_sort::merge_selection::MergeSelection;
use record_file_sort::record::Record;
use record_file_sort::sort::Sort;

mod common;

fn generated_input(dir: &PathBuf, desired_file_length: u64, seed: u64) -> Result<PathBuf, anyhow::Error> {
    let path = dir.join("generated.txt");
    let options = GeneratorOptions::new(desired_file_length)
        .with_batch_size(100)
        .with_vocabulary_length(30)
        .with_text_max_length(60)
        .with_number_max_value(20)
        .with_reuse_line_chance(20)
        .with_seed(seed);
    FileGenerator::new(options)?.create_file(&path)?;
    Ok(path)
}

fn sort_with_batch(input: &PathBuf, output: &PathBuf, max_records_per_run: usize) -> Result<(), anyhow::Error> {
    let mut sort = Sort::new(input.clone());
    sort.with_output(output.clone());
    sort.with_max_records_per_run(max_records_per_run);
    sort.sort()?;
    Ok(())
}

#[test]
fn test_sort_fixture() -> Result<(), anyhow::Error> {
    common::setup();
    let expected = fs::read_to_string("./tests/fixtures/example_expected.txt")?;
    for max_records_per_run in [1, 3, 1000] {
        let dir = common::temp_dir("./target/results/");
        let input = dir.join("example.txt");
        fs::copy("./tests/fixtures/example.txt", &input)?;

        let mut sort = Sort::new(input.clone());
        sort.with_max_records_per_run(max_records_per_run);
        let output = sort.sort()?;

        assert_eq!(output, dir.join("example_sorted.txt"));
        assert_eq!(fs::read_to_string(&output)?, expected, "max records per run: {max_records_per_run}");
        assert_eq!(common::dir_entries(&dir)?, vec!["example.txt", "example_sorted.txt"]);
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[test]
fn test_output_is_ordered_permutation() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = generated_input(&dir, 30_000, 11)?;
    let output = dir.join("output.txt");
    sort_with_batch(&input, &output, 97)?;

    let mut input_records: Vec<Record> = common::read_lines(input)?
        .iter()
        .map(|line| Record::parse(line))
        .collect::<Result<_, _>>()?;
    let output_records: Vec<Record> = common::read_lines(output)?
        .iter()
        .map(|line| Record::parse(line))
        .collect::<Result<_, _>>()?;

    assert!(output_records.windows(2).all(|pair| pair[0] <= pair[1]));
    input_records.sort();
    assert_eq!(input_records, output_records);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_sort_is_idempotent() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = generated_input(&dir, 30_000, 12)?;
    let first = dir.join("first.txt");
    let second = dir.join("second.txt");
    sort_with_batch(&input, &first, 50)?;
    sort_with_batch(&first, &second, 70)?;
    assert_eq!(fs::read(&first)?, fs::read(&second)?);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_batch_size_invariance() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = generated_input(&dir, 8_000, 13)?;
    let total = common::read_lines(input.clone())?.len();
    let single = dir.join("single.txt");
    let whole = dir.join("whole.txt");
    sort_with_batch(&input, &single, 1)?;
    sort_with_batch(&input, &whole, total)?;
    assert_eq!(fs::read(&single)?, fs::read(&whole)?);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_merge_selections_agree() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = generated_input(&dir, 20_000, 14)?;
    let mut outputs = Vec::new();
    for selection in [MergeSelection::Linear, MergeSelection::Heap, MergeSelection::Auto] {
        let output = dir.join(format!("{selection}.txt"));
        let mut sort = Sort::new(input.clone());
        sort.with_output(output.clone());
        sort.with_max_records_per_run(10);
        sort.with_merge_selection(selection);
        sort.sort()?;
        outputs.push(fs::read(output)?);
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_two_single_record_runs() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    common::write_lines(&input, &["1. b", "2. a"])?;
    let output = dir.join("output.txt");
    sort_with_batch(&input, &output, 1)?;
    assert_eq!(common::read_lines(output)?, vec!["2. a", "1. b"]);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_empty_input() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("empty.txt");
    fs::write(&input, "")?;
    let output = Sort::new(input.clone()).sort()?;
    assert!(output.exists());
    assert_eq!(fs::metadata(&output)?.len(), 0);
    assert_eq!(common::dir_entries(&dir)?, vec!["empty.txt", "empty_sorted.txt"]);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_malformed_input() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    common::write_lines(&input, &["1. b", "2. a", "abc. text", "3. c"])?;
    let mut sort = Sort::new(input.clone());
    sort.with_max_records_per_run(1);
    match sort.sort() {
        Err(SortError::Format { line_number, source, .. }) => {
            assert_eq!(line_number, 3);
            assert_eq!(source, ParseRecordError::Grammar { line: "abc. text".to_string() });
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(common::dir_entries(&dir)?, vec!["input.txt"]);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_missing_input() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let result = Sort::new(dir.join("missing.txt")).sort();
    assert!(matches!(result, Err(SortError::InputNotFound { .. })));
    assert!(common::dir_entries(&dir)?.is_empty());
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cancelled_sort() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    common::write_lines(&input, &["1. b", "2. a"])?;
    let cancellation = Cancellation::new();
    let mut sort = Sort::new(input.clone());
    sort.with_cancellation(cancellation.clone());
    cancellation.cancel();
    assert!(matches!(sort.sort(), Err(SortError::Cancelled)));
    assert!(!sort.output_path().exists());
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_rerun_overwrites_stale_runs() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    common::write_lines(&input, &["3. c", "1. b", "2. a"])?;
    // leftovers of an earlier failed sort with the same run names
    fs::write(dir.join("input.part-0.txt"), "garbage\n")?;
    fs::write(dir.join("input.part-1.txt"), "9. zzz\n")?;

    let mut sort = Sort::new(input.clone());
    sort.with_max_records_per_run(2);
    let output = sort.sort()?;
    assert_eq!(common::read_lines(output)?, vec!["2. a", "1. b", "3. c"]);
    assert_eq!(common::dir_entries(&dir)?, vec!["input.txt", "input_sorted.txt"]);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_runs_in_tmp_dir() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let tmp = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    common::write_lines(&input, &["3. c", "1. b", "2. a"])?;
    let mut sort = Sort::new(input.clone());
    sort.with_max_records_per_run(1);
    sort.with_tmp_dir(tmp.clone());
    sort.sort()?;
    assert!(common::dir_entries(&tmp)?.is_empty());
    fs::remove_dir_all(dir)?;
    fs::remove_dir_all(tmp)?;
    Ok(())
}

#[test]
fn test_text_ending_in_carriage_return_is_preserved() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    fs::write(&input, "2. b\r\n1. a\r\r\n3. c\r\n4. d\r")?;
    let output = dir.join("output.txt");
    // one record per run so every record passes through a run file
    sort_with_batch(&input, &output, 1)?;

    let content = fs::read_to_string(&output)?;
    assert_eq!(content, "1. a\r\n2. b\n3. c\n4. d\r\n");
    let mut output_records: Vec<Record> = content
        .split_terminator('\n')
        .map(Record::parse)
        .collect::<Result<_, _>>()?;
    let mut input_records = vec![
        Record::new(2, "b".to_string()),
        Record::new(1, "a\r".to_string()),
        Record::new(3, "c".to_string()),
        Record::new(4, "d\r".to_string()),
    ];
    input_records.sort();
    output_records.sort();
    assert_eq!(input_records, output_records);
    assert_eq!(common::dir_entries(&dir)?, vec!["input.txt", "output.txt"]);
    fs::remove_dir_all(dir)?;
    Ok(())
}

#[test]
fn test_cancel_during_split_keeps_written_runs() -> Result<(), anyhow::Error> {
    common::setup();
    let dir = common::temp_dir("./target/results/");
    let input = dir.join("input.txt");
    let mut content = String::new();
    for i in 0..200_000 {
        content.push_str(&format!("{}. text {}\n", i, i % 997));
    }
    fs::write(&input, content)?;

    let cancellation = Cancellation::new();
    let first_run = dir.join("input.part-0.txt");
    let watcher = {
        let cancellation = cancellation.clone();
        let first_run = first_run.clone();
        thread::spawn(move || {
            let start = Instant::now();
            while !first_run.exists() && start.elapsed() < Duration::from_secs(30) {
                thread::yield_now();
            }
            cancellation.cancel();
        })
    };

    let mut sort = Sort::new(input.clone());
    sort.with_max_records_per_run(100);
    sort.with_cancellation(cancellation);
    let result = sort.sort();
    watcher.join().expect("watcher thread panicked");

    assert!(matches!(result, Err(SortError::Cancelled)), "unexpected result: {:?}", result);
    assert!(!sort.output_path().exists());
    assert!(first_run.exists());
    let runs: Vec<String> = common::dir_entries(&dir)?
        .into_iter()
        .filter(|name| name.starts_with("input.part-"))
        .collect();
    assert!(!runs.is_empty());
    for run in runs {
        let records: Vec<Record> = common::read_lines(dir.join(&run))?
            .iter()
            .map(|line| Record::parse(line))
            .collect::<Result<_, _>>()?;
        assert_eq!(records.len(), 100, "run: {run}");
        assert!(records.windows(2).all(|pair| pair[0] <= pair[1]), "run: {run}");
    }
    fs::remove_dir_all(dir)?;
    Ok(())
}
