//! CPU trace records and the line grammar that extracts them.
//!
//! A raw trace line looks like
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7
//! ```
//!
//! Only the leading program counter and the `A X Y P SP` registers are kept.
//! The canonical rendering is `C000 A:00 X:00 Y:00 P:24 S:FD`, which parses
//! back to the same record.

use std::fmt;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    #[serde(serialize_with = "hex4")]
    pub pc: u16,
    #[serde(serialize_with = "hex2")]
    pub a: u8,
    #[serde(serialize_with = "hex2")]
    pub x: u8,
    #[serde(serialize_with = "hex2")]
    pub y: u8,
    #[serde(serialize_with = "hex2")]
    pub p: u8,
    #[serde(serialize_with = "hex2")]
    pub s: u8,
}

fn hex4<S: Serializer>(v: &u16, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:04X}", v))
}

fn hex2<S: Serializer>(v: &u8, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:02X}", v))
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} S:{:02X}",
            self.pc, self.a, self.x, self.y, self.p, self.s
        )
    }
}

/// Register slots of a [`TraceRecord`], in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Pc,
    A,
    X,
    Y,
    P,
    S,
}

impl Field {
    pub fn all() -> &'static [Field] {
        &[Field::Pc, Field::A, Field::X, Field::Y, Field::P, Field::S]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Pc => "PC",
            Field::A => "A",
            Field::X => "X",
            Field::Y => "Y",
            Field::P => "P",
            Field::S => "S",
        }
    }

    fn width(&self) -> usize {
        if matches!(self, Field::Pc) { 4 } else { 2 }
    }
}

/// One register that differs between two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: Field,
    pub expected: u16,
    pub actual: u16,
}

// Values go out as hex strings at the register's width, like `TraceRecord`.
impl Serialize for FieldDiff {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let w = self.field.width();
        let mut st = s.serialize_struct("FieldDiff", 3)?;
        st.serialize_field("field", self.field.label())?;
        st.serialize_field("expected", &format!("{:0w$X}", self.expected, w = w))?;
        st.serialize_field("actual", &format!("{:0w$X}", self.actual, w = w))?;
        st.end()
    }
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.field.width();
        write!(
            f,
            "{}: expected {:0w$X}, got {:0w$X}",
            self.field.label(),
            self.expected,
            self.actual,
            w = w
        )
    }
}

impl TraceRecord {
    pub fn get(&self, field: Field) -> u16 {
        match field {
            Field::Pc => self.pc,
            Field::A => self.a as u16,
            Field::X => self.x as u16,
            Field::Y => self.y as u16,
            Field::P => self.p as u16,
            Field::S => self.s as u16,
        }
    }

    /// Registers whose values differ, in canonical order.
    pub fn diff(&self, actual: &TraceRecord) -> Vec<FieldDiff> {
        Field::all()
            .iter()
            .filter(|f| self.get(**f) != actual.get(**f))
            .map(|&field| FieldDiff {
                field,
                expected: self.get(field),
                actual: actual.get(field),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept `a-f` as well as `A-F` in hex tokens.
    pub allow_lowercase: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatch {
    Matched(TraceRecord),
    Unmatched,
}

impl LineMatch {
    pub fn record(self) -> Option<TraceRecord> {
        match self {
            LineMatch::Matched(r) => Some(r),
            LineMatch::Unmatched => None,
        }
    }
}

/// Extracts a [`TraceRecord`] from one line of a trace.
///
/// The line must open with a four digit program counter. The register block
/// `A:hh X:hh Y:hh P:hh SP:hh` may appear anywhere after it; the leftmost
/// occurrence that parses completely is used. `S:` is accepted in place of
/// `SP:` so canonical lines are themselves valid input.
pub fn parse_line(line: &str, opts: &ParseOptions) -> LineMatch {
    let bytes = line.as_bytes();

    let mut head = Cursor { rest: bytes, lowercase: opts.allow_lowercase };
    let Some(pc) = head.hex(4) else {
        return LineMatch::Unmatched;
    };

    let tail = head.rest;
    for start in 0..tail.len() {
        if !tail[start..].starts_with(b"A:") {
            continue;
        }
        let mut cur = Cursor { rest: &tail[start..], lowercase: opts.allow_lowercase };
        if let Some(regs) = cur.registers() {
            let (a, x, y, p, s) = regs;
            return LineMatch::Matched(TraceRecord { pc, a, x, y, p, s });
        }
    }

    LineMatch::Unmatched
}

struct Cursor<'a> {
    rest: &'a [u8],
    lowercase: bool,
}

impl<'a> Cursor<'a> {
    fn tag(&mut self, t: &[u8]) -> Option<()> {
        self.rest = self.rest.strip_prefix(t)?;
        Some(())
    }

    fn hex(&mut self, digits: usize) -> Option<u16> {
        let token = self.rest.get(..digits)?;
        let mut value: u16 = 0;
        for &b in token {
            let nibble = match b {
                b'0'..=b'9' => b - b'0',
                b'A'..=b'F' => b - b'A' + 10,
                b'a'..=b'f' if self.lowercase => b - b'a' + 10,
                _ => return None,
            };
            value = (value << 4) | nibble as u16;
        }
        self.rest = &self.rest[digits..];
        Some(value)
    }

    fn byte(&mut self) -> Option<u8> {
        self.hex(2).map(|v| v as u8)
    }

    fn registers(&mut self) -> Option<(u8, u8, u8, u8, u8)> {
        self.tag(b"A:")?;
        let a = self.byte()?;
        self.tag(b" X:")?;
        let x = self.byte()?;
        self.tag(b" Y:")?;
        let y = self.byte()?;
        self.tag(b" P:")?;
        let p = self.byte()?;
        if self.tag(b" SP:").is_none() {
            self.tag(b" S:")?;
        }
        let s = self.byte()?;
        Some((a, x, y, p, s))
    }
}
