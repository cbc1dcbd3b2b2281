use std::fs;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::compare::{open, LossyLines};
use crate::error::TraceError;
use crate::record::{parse_line, LineMatch, ParseOptions, TraceRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub parse: ParseOptions,
    /// Fail on the first non-blank line that isn't a trace record instead of
    /// dropping it.
    pub strict: bool,
}

/// Records extracted from a trace, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub records: Vec<TraceRecord>,
    pub dropped: usize,
}

impl Normalized {
    pub fn summary(&self) -> NormalizeSummary {
        NormalizeSummary { kept: self.records.len(), dropped: self.dropped }
    }

    /// Canonical text: one record per line, each newline-terminated.
    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for rec in &self.records {
            writeln!(out, "{}", rec)?;
        }
        out.flush()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeSummary {
    pub kept: usize,
    pub dropped: usize,
}

pub fn normalize_lines<R: BufRead>(reader: R, opts: &NormalizeOptions) -> Result<Normalized, TraceError> {
    let mut out = Normalized::default();

    for (i, line) in LossyLines::new(reader).enumerate() {
        let line = line.map_err(TraceError::Read)?;
        match parse_line(&line, &opts.parse) {
            LineMatch::Matched(rec) => out.records.push(rec),
            LineMatch::Unmatched if opts.strict && !line.trim().is_empty() => {
                return Err(TraceError::Unmatched { line: i + 1, content: line });
            }
            LineMatch::Unmatched => out.dropped += 1,
        }
    }

    Ok(out)
}

/// Rewrites `path` in canonical form. The original is only replaced once the
/// new content is fully written.
pub fn normalize_file<P: AsRef<Path>>(path: P, opts: &NormalizeOptions) -> Result<NormalizeSummary, TraceError> {
    let path = path.as_ref();
    normalize_to(path, path, opts)
}

/// Canonicalizes `input` into `output`. `output` may be the same path.
pub fn normalize_to<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    opts: &NormalizeOptions,
) -> Result<NormalizeSummary, TraceError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    debug!(?input, ?output, strict = opts.strict, "normalizing trace");

    let normalized = normalize_lines(open(input)?, opts)?;
    write_atomic(output, &normalized)?;

    let summary = normalized.summary();
    info!(kept = summary.kept, dropped = summary.dropped, "normalized {:?}", output);
    Ok(summary)
}

fn write_atomic(path: &Path, normalized: &Normalized) -> Result<(), TraceError> {
    let write_err = |source| TraceError::Write { path: path.to_path_buf(), source };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    {
        let writer = BufWriter::new(tmp.as_file_mut());
        normalized.write_to(writer).map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;

    // Keep the mode of the file being replaced; the temp file starts at 0600.
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(write_err)?;
    }

    tmp.persist(path)
        .map_err(|e| TraceError::Persist { path: path.to_path_buf(), source: e.error })?;
    Ok(())
}
