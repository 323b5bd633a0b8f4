//! VICAR label parsing.
//!
//! A VICAR label is a run of whitespace separated `KEY=VALUE` pairs. Values are
//! bare tokens (integers, reals or words), single quoted strings using `''` as an
//! escaped quote, or parenthesized comma separated lists of either. The label is
//! padded to `LBLSIZE` bytes with spaces or NULs; the first NUL ends it.

use crate::image_pipeline::common::error::{ConversionError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum LabelValue {
    Int(i64),
    Real(f64),
    Str(String),
    List(Vec<LabelValue>),
}

impl LabelValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            LabelValue::Int(v) => Some(*v),
            LabelValue::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn from_bare(token: &str) -> Self {
        if let Ok(v) = token.parse::<i64>() {
            LabelValue::Int(v)
        } else if let Ok(v) = token.parse::<f64>() {
            LabelValue::Real(v)
        } else {
            LabelValue::Str(token.to_string())
        }
    }
}

/// Parsed label entries in file order. Keys repeat across property and history
/// sections; lookups return the first occurrence, which is the system label.
#[derive(Debug, Clone, Default)]
pub struct VicarLabel {
    entries: Vec<(String, LabelValue)>,
}

impl VicarLabel {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.split('\0').next().unwrap_or_default();
        let mut parser = Parser {
            bytes: text.as_bytes(),
            pos: 0,
        };
        let mut entries = Vec::new();

        loop {
            parser.skip_whitespace();
            if parser.at_end() {
                break;
            }

            let key = parser.key()?;
            parser.skip_whitespace();
            if !parser.eat(b'=') {
                return Err(label_error(format!("expected '=' after key {key}")));
            }
            parser.skip_whitespace();
            let value = parser.value()?;
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&LabelValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-negative integer value of `key`, or an error naming the key.
    pub fn require_usize(&self, key: &str) -> Result<usize> {
        self.usize_or_none(key)?
            .ok_or_else(|| label_error(format!("missing required label {key}")))
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize> {
        Ok(self.usize_or_none(key)?.unwrap_or(default))
    }

    /// Upper-cased string value of `key`, or `default` when absent.
    pub fn keyword_or(&self, key: &str, default: &str) -> Result<String> {
        match self.get(key) {
            None => Ok(default.to_string()),
            Some(value) => value
                .as_str()
                .map(|s| s.trim().to_ascii_uppercase())
                .ok_or_else(|| label_error(format!("label {key} is not a string: {value:?}"))),
        }
    }

    fn usize_or_none(&self, key: &str) -> Result<Option<usize>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_int()
                .and_then(|v| usize::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| label_error(format!("label {key} is not a non-negative integer: {value:?}"))),
        }
    }
}

fn label_error(message: String) -> ConversionError {
    ConversionError::DecodeError(format!("invalid label: {message}"))
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        // Only ASCII delimiters stop the scan, so the slice stays on char boundaries.
        let bytes: &'a [u8] = self.bytes;
        std::str::from_utf8(&bytes[start..self.pos]).unwrap_or_default()
    }

    fn key(&mut self) -> Result<String> {
        let key = self.take_while(|b| b != b'=' && !b.is_ascii_whitespace());
        if key.is_empty() {
            return Err(label_error(format!("empty key at byte {}", self.pos)));
        }
        Ok(key.to_ascii_uppercase())
    }

    fn value(&mut self) -> Result<LabelValue> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                self.list()
            }
            Some(_) => self.scalar(|b| b.is_ascii_whitespace()),
            None => Err(label_error("label ends before value".to_string())),
        }
    }

    fn list(&mut self) -> Result<LabelValue> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(label_error("unterminated list".to_string())),
                Some(b')') => {
                    self.pos += 1;
                    return Ok(LabelValue::List(items));
                }
                Some(b',') => self.pos += 1,
                Some(_) => {
                    items.push(self.scalar(|b| b == b',' || b == b')' || b.is_ascii_whitespace())?)
                }
            }
        }
    }

    fn scalar(&mut self, ends: impl Fn(u8) -> bool) -> Result<LabelValue> {
        if self.eat(b'\'') {
            return self.quoted();
        }
        let token = self.take_while(|b| !ends(b));
        Ok(LabelValue::from_bare(token))
    }

    fn quoted(&mut self) -> Result<LabelValue> {
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(label_error("unterminated string".to_string())),
                Some(b'\'') => {
                    self.pos += 1;
                    if self.eat(b'\'') {
                        out.push(b'\'');
                    } else {
                        return Ok(LabelValue::Str(String::from_utf8_lossy(&out).into_owned()));
                    }
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_system_label_values() {
        let label = VicarLabel::parse(
            "LBLSIZE=512  FORMAT='HALF'  TYPE='IMAGE'  NL=2  NS=3  NB=1 ORG='BSQ' GAIN=1.5",
        )
        .unwrap();

        assert_eq!(label.require_usize("LBLSIZE").unwrap(), 512);
        assert_eq!(label.keyword_or("FORMAT", "BYTE").unwrap(), "HALF");
        assert_eq!(label.get("GAIN"), Some(&LabelValue::Real(1.5)));
        assert_eq!(label.len(), 8);
    }

    #[test]
    fn first_occurrence_wins() {
        let label = VicarLabel::parse("TASK='FIRST' NL=1 TASK='SECOND'").unwrap();
        assert_eq!(label.get("TASK").and_then(|v| v.as_str()), Some("FIRST"));
    }

    #[test]
    fn quoted_strings_keep_spaces_and_escaped_quotes() {
        let label = VicarLabel::parse("NOTE='it''s a  test' ORG='BSQ'").unwrap();
        assert_eq!(label.get("NOTE").and_then(|v| v.as_str()), Some("it's a  test"));
        assert_eq!(label.keyword_or("ORG", "BIL").unwrap(), "BSQ");
    }

    #[test]
    fn parses_lists() {
        let label = VicarLabel::parse("ANGLES=(1, 2.5,'X') NL=4").unwrap();
        assert_eq!(
            label.get("ANGLES"),
            Some(&LabelValue::List(vec![
                LabelValue::Int(1),
                LabelValue::Real(2.5),
                LabelValue::Str("X".to_string()),
            ]))
        );
        assert_eq!(label.require_usize("NL").unwrap(), 4);
    }

    #[test]
    fn stops_at_nul_padding() {
        let label = VicarLabel::parse("NL=2 NS=2\0\0\0garbage").unwrap();
        assert_eq!(label.len(), 2);
    }

    #[test]
    fn defaults_and_missing_keys() {
        let label = VicarLabel::parse("NS=10").unwrap();
        assert_eq!(label.usize_or("NBB", 0).unwrap(), 0);
        assert_eq!(label.keyword_or("INTFMT", "HIGH").unwrap(), "HIGH");
        assert!(matches!(label.require_usize("NL"), Err(ConversionError::DecodeError(_))));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(VicarLabel::parse("NOTE='open").is_err());
        assert!(VicarLabel::parse("NL 5").is_err());
        assert!(VicarLabel::parse("LIST=(1,2").is_err());
        assert!(VicarLabel::parse("NL=-3").unwrap().require_usize("NL").is_err());
    }
}
