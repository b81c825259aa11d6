//! Canonical text form of the AST
//!
//! PuppetDB accepts any valid JSON, but queries are rendered the same way
//! every time so they can be logged, compared and cached by callers:
//!
//! ```text
//! ["and", ["=", "certname", "test01"], [">", "uptime_days", 3]]
//! ```
//!
//! Non-ASCII text is written as raw UTF-8, not `\uXXXX` escapes. Floats use
//! serde_json's shortest form, so `1e20` has no `+` in the exponent.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::io;

use crate::query::error::{QueryError, QueryResult};

/// JSON formatter that separates elements with `", "` and keys with `": "`
#[derive(Debug, Clone, Copy, Default)]
struct AstFormatter;

impl Formatter for AstFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Render an AST value in canonical text form
pub fn to_text(value: &Value) -> QueryResult<String> {
    let mut buf = Vec::with_capacity(64);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AstFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| QueryError::InvalidJson(e.to_string()))
}

/// Parse pre-serialized query text into an AST value
///
/// Only arrays are accepted: every AST node is an array.
pub fn parse(text: &str) -> QueryResult<Value> {
    let value: Value = serde_json::from_str(text)?;
    if value.is_array() {
        Ok(value)
    } else {
        Err(QueryError::InvalidJson(format!(
            "expected a JSON array, got '{}'",
            text.trim()
        )))
    }
}
