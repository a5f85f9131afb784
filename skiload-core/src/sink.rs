use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{Error, Result};
use crate::sample::{RequestMethod, Sample};

pub const CSV_HEADER: &str = "method,path,start_timestamp_ms,latency_ms,status";

/// Destination for the raw samples of a finished run.
pub trait SampleSink {
    fn write(&self, samples: &[Sample]) -> Result<()>;
}

/// Writes samples as CSV, replacing any existing file at `path`.
#[derive(Debug, Clone)]
pub struct CsvSampleSink {
    path: PathBuf,
}

impl CsvSampleSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSink for CsvSampleSink {
    fn write(&self, samples: &[Sample]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let mut out = BufWriter::new(file);
        write_csv(&mut out, samples)?;
        out.flush()?;
        tracing::debug!(path = %self.path.display(), rows = samples.len(), "samples written");
        Ok(())
    }
}

pub fn write_csv<W: Write>(out: &mut W, samples: &[Sample]) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for s in samples {
        writeln!(
            out,
            "{},{},{},{},{}",
            s.method, s.path, s.start_time_ms, s.latency_ms, s.status
        )?;
    }
    Ok(())
}

/// Parses samples previously written by [`write_csv`]. The header row is required.
pub fn read_csv<R: BufRead>(input: R) -> Result<Vec<Sample>> {
    let mut lines = input.lines();
    match lines.next().transpose()? {
        Some(header) if header.trim_end() == CSV_HEADER => {}
        Some(header) => {
            return Err(Error::MalformedSample {
                line: 1,
                reason: format!("unexpected header `{}`", header.trim_end()),
            });
        }
        None => {
            return Err(Error::MalformedSample {
                line: 1,
                reason: "missing header".to_string(),
            });
        }
    }

    // Rows share a handful of paths; intern them.
    let mut paths: AHashMap<String, Arc<str>> = AHashMap::new();
    let mut samples = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line_no = idx + 2;
        let row = line.trim_end();
        if row.is_empty() {
            continue;
        }
        samples.push(parse_row(row, line_no, &mut paths)?);
    }
    Ok(samples)
}

pub fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    let file = File::open(path)?;
    read_csv(BufReader::new(file))
}

fn parse_row(row: &str, line: usize, paths: &mut AHashMap<String, Arc<str>>) -> Result<Sample> {
    let malformed = |reason: String| Error::MalformedSample { line, reason };

    let fields: Vec<&str> = row.split(',').collect();
    let [method, path, start, latency, status] = fields.as_slice() else {
        return Err(malformed(format!("expected 5 fields, got {}", fields.len())));
    };

    let method: RequestMethod = method
        .parse()
        .map_err(|_| malformed(format!("unknown method `{method}`")))?;
    let start_time_ms: u64 = start
        .parse()
        .map_err(|_| malformed(format!("invalid start timestamp `{start}`")))?;
    let latency_ms: u64 = latency
        .parse()
        .map_err(|_| malformed(format!("invalid latency `{latency}`")))?;
    let status: u16 = status
        .parse()
        .map_err(|_| malformed(format!("invalid status `{status}`")))?;

    let path = match paths.get(*path) {
        Some(p) => p.clone(),
        None => {
            let p: Arc<str> = Arc::from(*path);
            paths.insert((*path).to_string(), p.clone());
            p
        }
    };

    Ok(Sample {
        method,
        path,
        start_time_ms,
        latency_ms,
        status,
    })
}
