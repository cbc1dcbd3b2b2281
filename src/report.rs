use owo_colors::OwoColorize;
use serde_json::Value;

use crate::compare::{Comparison, Divergence};
use crate::record::ParseOptions;

/// Plain report lines for a divergence: the header, the expected and actual
/// lines, then one indented line per differing register if both sides are
/// trace records.
pub fn divergence_lines(d: &Divergence, opts: &ParseOptions) -> Vec<String> {
    let mut out = vec![
        format!("Line {} differs:", d.line),
        format!("Expected: {}", d.expected),
        format!("Actual:   {}", d.actual),
    ];
    if let Some(diffs) = d.field_diffs(opts) {
        out.extend(diffs.iter().map(|f| format!("  {}", f)));
    }
    out
}

/// JSON form of a comparison. A divergence between two trace records also
/// carries a `registers` array with the differing fields.
pub fn comparison_json(c: &Comparison, opts: &ParseOptions) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(c)?;
    if let (Some(d), Some(obj)) = (c.divergence(), value.as_object_mut()) {
        if let Some(diffs) = d.field_diffs(opts) {
            obj.insert("registers".to_string(), serde_json::to_value(diffs)?);
        }
    }
    Ok(value)
}

/// Prints a comparison to stdout. Identical results are silent unless
/// `verbose` is set.
pub fn print_comparison(c: &Comparison, opts: &ParseOptions, verbose: bool) {
    match c {
        Comparison::Diverged(d) => {
            let lines = divergence_lines(d, opts);
            println!("{}", lines[0].red().bold());
            println!("{}", lines[1]);
            println!("{}", lines[2].yellow());
            for extra in &lines[3..] {
                println!("{}", extra.yellow().bold());
            }
        }
        Comparison::Identical { compared } if verbose => {
            println!("{}", format!("No divergence in {} compared lines.", compared).green().bold());
        }
        Comparison::Identical { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_line_report_for_plain_text() {
        let d = Divergence { line: 7, expected: "foo".into(), actual: "bar".into() };
        assert_eq!(
            divergence_lines(&d, &ParseOptions::default()),
            vec!["Line 7 differs:", "Expected: foo", "Actual:   bar"]
        );
    }

    #[test]
    fn json_carries_register_diffs() {
        let d = Divergence {
            line: 2,
            expected: "C005 A:01 X:00 Y:00 P:24 SP:FD".into(),
            actual: "C005 A:02 X:00 Y:00 P:24 SP:FB".into(),
        };
        let json = comparison_json(&Comparison::Diverged(d), &ParseOptions::default()).unwrap();
        assert_eq!(json["result"], "diverged");
        assert_eq!(json["line"], 2);
        let regs = json["registers"].as_array().unwrap();
        assert_eq!(regs.len(), 2);
        assert_eq!(regs[0]["field"], "A");
        assert_eq!(regs[0]["expected"], "01");
        assert_eq!(regs[1]["field"], "S");
        assert_eq!(regs[1]["actual"], "FB");
    }

    #[test]
    fn json_without_registers_for_plain_text_or_identical() {
        let d = Divergence { line: 1, expected: "foo".into(), actual: "bar".into() };
        let json = comparison_json(&Comparison::Diverged(d), &ParseOptions::default()).unwrap();
        assert!(json.get("registers").is_none());

        let json = comparison_json(&Comparison::Identical { compared: 3 }, &ParseOptions::default()).unwrap();
        assert_eq!(json["result"], "identical");
        assert_eq!(json["compared"], 3);
    }

    #[test]
    fn register_details_for_trace_lines() {
        let d = Divergence {
            line: 2,
            expected: "C005 A:01 X:00 Y:00 P:24 SP:FD".into(),
            actual: "C005 A:02 X:00 Y:00 P:24 SP:FD".into(),
        };
        let lines = divergence_lines(&d, &ParseOptions::default());
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Line 2 differs:");
        assert_eq!(lines[3], "  A: expected 01, got 02");
    }
}
