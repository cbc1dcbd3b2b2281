pub mod compare;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod record;
pub mod report;
pub mod viewer;

pub use compare::{compare_files, compare_lines, Comparison, Divergence};
pub use error::TraceError;
pub use normalize::{normalize_file, normalize_lines, normalize_to, NormalizeOptions, NormalizeSummary, Normalized};
pub use record::{parse_line, Field, FieldDiff, LineMatch, ParseOptions, TraceRecord};
pub use report::{comparison_json, divergence_lines, print_comparison};
pub use viewer::view;

/// Reference log used when no expected path is given.
pub const DEFAULT_EXPECTED: &str = "roms/tests/nestest.log";
/// Emulator output used when no actual path is given.
pub const DEFAULT_ACTUAL: &str = "roms/tests/nestest_output.log";
