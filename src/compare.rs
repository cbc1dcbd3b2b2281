use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use serde::Serialize;
use tracing::debug;

use crate::error::TraceError;
use crate::record::{parse_line, FieldDiff, ParseOptions};

/// First line pair whose trimmed contents differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    /// 1-based.
    pub line: usize,
    pub expected: String,
    pub actual: String,
}

impl Divergence {
    /// Register-level differences, when both lines are trace records.
    pub fn field_diffs(&self, opts: &ParseOptions) -> Option<Vec<FieldDiff>> {
        let expected = parse_line(&self.expected, opts).record()?;
        let actual = parse_line(&self.actual, opts).record()?;
        Some(expected.diff(&actual))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Comparison {
    /// Every pair up to the end of the shorter source matched.
    Identical { compared: usize },
    Diverged(Divergence),
}

impl Comparison {
    pub fn is_identical(&self) -> bool {
        matches!(self, Comparison::Identical { .. })
    }

    pub fn divergence(&self) -> Option<&Divergence> {
        match self {
            Comparison::Diverged(d) => Some(d),
            Comparison::Identical { .. } => None,
        }
    }
}

/// Lines of a reader with terminators removed; invalid UTF-8 is replaced
/// rather than rejected.
pub(crate) struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new() }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Scans both sources in lockstep and stops at the first pair whose trimmed
/// contents differ, or when either source runs out.
pub fn compare_lines<E: BufRead, A: BufRead>(expected: E, actual: A) -> io::Result<Comparison> {
    let mut expected = LossyLines::new(expected);
    let mut actual = LossyLines::new(actual);
    let mut compared = 0;

    loop {
        let Some(e) = expected.next().transpose()? else { break };
        let Some(a) = actual.next().transpose()? else { break };
        compared += 1;

        let (e, a) = (e.trim(), a.trim());
        if e != a {
            return Ok(Comparison::Diverged(Divergence {
                line: compared,
                expected: e.to_string(),
                actual: a.to_string(),
            }));
        }
    }

    Ok(Comparison::Identical { compared })
}

pub fn compare_files<P: AsRef<Path>, Q: AsRef<Path>>(expected: P, actual: Q) -> Result<Comparison, TraceError> {
    let (expected, actual) = (expected.as_ref(), actual.as_ref());
    debug!(?expected, ?actual, "comparing logs");

    let e = open(expected)?;
    let a = open(actual)?;
    let result = compare_lines(e, a).map_err(TraceError::Read)?;

    match &result {
        Comparison::Identical { compared } => debug!(compared, "no divergence"),
        Comparison::Diverged(d) => debug!(line = d.line, "divergence found"),
    }
    Ok(result)
}

pub(crate) fn open(path: &Path) -> Result<BufReader<File>, TraceError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TraceError::Open { path: path.to_path_buf(), source })
}
