//! Generator of random record files.
//!
//! Generated lines follow the `<number>. <text>` format, the text is made of words drawn from a
//! random vocabulary, and a configurable share of lines repeats an earlier line of the same batch
//! so that the file contains duplicates.

use std::cmp::max;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use data_encoding::HEXLOWER;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{IoContext, SortError};
use crate::pipeline::{Completion, WritePipeline};
use crate::record::Record;

const MAX_WORD_ATTEMPTS: usize = 20;

/// Generator options. The defaults produce lines of up to ~1KB from 1000 words.
#[derive(Clone, Debug)]
pub struct GeneratorOptions {
    desired_file_length: u64,
    vocabulary_length: usize,
    max_word_length: usize,
    reuse_line_chance: u32,
    batch_size: usize,
    number_max_value: u64,
    text_max_length: usize,
    seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            desired_file_length: 0,
            vocabulary_length: 1000,
            max_word_length: 16,
            reuse_line_chance: 5,
            batch_size: 1_000_000,
            number_max_value: 1024,
            text_max_length: 1024,
            seed: None,
        }
    }
}

impl GeneratorOptions {
    pub fn new(desired_file_length: u64) -> GeneratorOptions {
        GeneratorOptions {
            desired_file_length,
            ..Default::default()
        }
    }

    /// Generation stops once the file is at least this long, in bytes
    pub fn with_desired_file_length(mut self, desired_file_length: u64) -> GeneratorOptions {
        self.desired_file_length = desired_file_length;
        self
    }

    /// Number of unique words texts are made of
    pub fn with_vocabulary_length(mut self, vocabulary_length: usize) -> GeneratorOptions {
        self.vocabulary_length = vocabulary_length;
        self
    }

    pub fn with_max_word_length(mut self, max_word_length: usize) -> GeneratorOptions {
        self.max_word_length = max_word_length;
        self
    }

    /// Chance, in percent, that a line repeats an earlier line of its batch
    pub fn with_reuse_line_chance(mut self, reuse_line_chance: u32) -> GeneratorOptions {
        self.reuse_line_chance = reuse_line_chance;
        self
    }

    /// Lines are generated and appended to the file in batches of this many lines
    pub fn with_batch_size(mut self, batch_size: usize) -> GeneratorOptions {
        self.batch_size = batch_size;
        self
    }

    pub fn with_number_max_value(mut self, number_max_value: u64) -> GeneratorOptions {
        self.number_max_value = number_max_value;
        self
    }

    pub fn with_text_max_length(mut self, text_max_length: usize) -> GeneratorOptions {
        self.text_max_length = text_max_length;
        self
    }

    /// Seed the random generator for reproducible files
    pub fn with_seed(mut self, seed: u64) -> GeneratorOptions {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), SortError> {
        if self.vocabulary_length == 0 {
            return Err(SortError::invalid_parameter("vocabulary_length", "must be >= 1"));
        }
        if self.max_word_length == 0 {
            return Err(SortError::invalid_parameter("max_word_length", "must be >= 1"));
        }
        if self.reuse_line_chance > 100 {
            return Err(SortError::invalid_parameter("reuse_line_chance", "must be between 0 and 100"));
        }
        if self.batch_size == 0 {
            return Err(SortError::invalid_parameter("batch_size", "must be >= 1"));
        }
        if self.text_max_length == 0 {
            return Err(SortError::invalid_parameter("text_max_length", "must be >= 1"));
        }
        Ok(())
    }
}

/// Timing collected while creating a file
#[derive(Clone, Debug, Default)]
pub struct CreateFileStats {
    pub batch_count: usize,
    pub gen_times: Vec<Duration>,
    pub write_times: Vec<Duration>,
    pub wait_times: Vec<Duration>,
}

impl CreateFileStats {
    fn record_completion(&mut self, completion: Completion) {
        self.write_times.push(completion.elapsed);
        self.wait_times.push(completion.waited);
    }

    fn average(times: &[Duration]) -> Duration {
        if times.is_empty() {
            Duration::ZERO
        } else {
            times.iter().sum::<Duration>() / times.len() as u32
        }
    }

    pub fn gen_average(&self) -> Duration {
        Self::average(&self.gen_times)
    }

    pub fn write_average(&self) -> Duration {
        Self::average(&self.write_times)
    }

    pub fn wait_average(&self) -> Duration {
        Self::average(&self.wait_times)
    }
}

fn create_word(rng: &mut StdRng, length: usize) -> String {
    let mut word = String::with_capacity(length + 32);
    while word.len() < length {
        word.push_str(&HEXLOWER.encode(&rng.gen::<[u8; 16]>()));
    }
    word.truncate(length);
    word
}

fn build_vocabulary(options: &GeneratorOptions, rng: &mut StdRng) -> Result<Vec<String>, SortError> {
    let mut vocabulary = Vec::with_capacity(options.vocabulary_length);
    let mut known = HashSet::with_capacity(options.vocabulary_length);
    for _ in 0..options.vocabulary_length {
        let word = (0..MAX_WORD_ATTEMPTS)
            .map(|_| {
                let length = rng.gen_range(1..=options.max_word_length);
                create_word(rng, length)
            })
            .find(|word| !known.contains(word))
            .ok_or_else(|| SortError::invalid_parameter(
                "vocabulary_length",
                format!("can't create a new unique word after {} attempts", MAX_WORD_ATTEMPTS),
            ))?;
        known.insert(word.clone());
        vocabulary.push(word);
    }
    Ok(vocabulary)
}

fn append_batch(path: &Path, batch: &[String]) -> Result<(), SortError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .io_context(|| format!("open {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in batch {
        writeln!(writer, "{}", line).io_context(|| format!("append to {}", path.display()))?;
    }
    writer.flush().io_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Creates files of random records
///
/// # Examples
/// ```
/// use record_file_sort::generator::{FileGenerator, GeneratorOptions};
///
/// fn generate(path: &std::path::Path) -> Result<(), anyhow::Error> {
///     let options = GeneratorOptions::new(10_000_000).with_batch_size(50_000);
///     let mut generator = FileGenerator::new(options)?;
///     let stats = generator.create_file(path)?;
///     log::info!("Created {} batches", stats.batch_count);
///     Ok(())
/// }
/// ```
pub struct FileGenerator {
    options: GeneratorOptions,
    rng: StdRng,
    vocabulary: Vec<String>,
}

impl FileGenerator {
    /// Validate `options` and build the vocabulary
    pub fn new(options: GeneratorOptions) -> Result<FileGenerator, SortError> {
        options.validate()?;
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let vocabulary = build_vocabulary(&options, &mut rng)?;
        log::debug!("Built vocabulary of {} words", vocabulary.len());
        Ok(
            FileGenerator {
                options,
                rng,
                vocabulary,
            }
        )
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    fn create_record(&mut self) -> Record {
        let number = self.rng.gen_range(0..=self.options.number_max_value);
        let text_min_length = self.rng.gen_range(1..=max(1, self.options.text_max_length - 1));
        let mut text = String::new();
        while text.len() < text_min_length {
            let word = &self.vocabulary[self.rng.gen_range(0..self.vocabulary.len())];
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
        Record::new(number, text)
    }

    fn create_batch(&mut self) -> Vec<String> {
        let size = self.options.batch_size;
        let mut batch: Vec<String> = Vec::with_capacity(size);
        for i in 0..size {
            let reuse = self.rng.gen_range(0..100) < self.options.reuse_line_chance;
            let line = if reuse && i != 0 {
                batch[self.rng.gen_range(0..i)].clone()
            } else {
                self.create_record().to_string()
            };
            batch.push(line);
        }
        batch
    }

    /// Create `path`, replacing any existing file, and fill it with batches of random records
    /// until it reaches the desired length
    pub fn create_file(&mut self, path: &Path) -> Result<CreateFileStats, SortError> {
        log::info!("Start generating {}, desired length: {} bytes", path.display(), self.options.desired_file_length);
        File::create(path).io_context(|| format!("create {}", path.display()))?;
        let mut stats = CreateFileStats::default();
        let mut pipeline = WritePipeline::new("batch-writer")?;
        let result = self.fill(path, &mut pipeline, &mut stats);
        let finished = pipeline.finish();
        result?;
        if let Some(completion) = finished? {
            stats.record_completion(completion);
        }
        log::info!("Finish generating {}, batches: {}", path.display(), stats.batch_count);
        Ok(stats)
    }

    fn fill(&mut self, path: &Path, pipeline: &mut WritePipeline, stats: &mut CreateFileStats) -> Result<(), SortError> {
        let desired = self.options.desired_file_length;
        let mut current_length: u64 = 0;
        let mut in_flight = false;
        while current_length < desired {
            let start = Instant::now();
            let batch = self.create_batch();
            stats.gen_times.push(start.elapsed());

            if in_flight {
                if let Some(completion) = pipeline.wait()? {
                    stats.record_completion(completion);
                }
                in_flight = false;
                current_length = std::fs::metadata(path)
                    .io_context(|| format!("stat {}", path.display()))?
                    .len();
            }

            if current_length < desired {
                let target: PathBuf = path.to_path_buf();
                pipeline.submit(move || append_batch(&target, &batch))?;
                stats.batch_count += 1;
                in_flight = true;
            }
        }
        Ok(())
    }
}
