use crate::error::DecodeError;

#[derive(Clone, Copy, Debug)]
enum Scope {
    Object { entries: usize },
    Array { entries: usize },
}

#[derive(Clone, Debug)]
enum PathSegment {
    Key(String),
    Index(usize),
    // scope opened but no member read yet
    Start,
}

/// Pull reader over a buffer of JSON text. One `PathSegment` is kept per open
/// scope so `path()` can render a gson-style structural path (for error
/// messages only, never for dispatch).
pub struct JsonReader<'a> {
    buf: &'a [u8],
    pos: usize,
    scopes: Vec<Scope>,
    path: Vec<PathSegment>,
}

impl<'a> JsonReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        JsonReader {
            buf,
            pos: 0,
            scopes: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Structural path of the member being read, e.g. `$.annotations[0].value`.
    pub fn path(&self) -> String {
        use std::fmt::Write;

        let mut path = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    path.push('.');
                    path.push_str(key);
                }
                PathSegment::Index(index) => {
                    let _ = write!(path, "[{}]", index);
                }
                PathSegment::Start => {}
            }
        }
        path
    }

    /// True while the buffer holds more top-level data. Lets callers layer a
    /// stream of spans over repeated single-object decodes.
    pub fn has_more_input(&mut self) -> bool {
        self.skip_whitespace();
        self.pos < self.buf.len()
    }

    pub fn begin_object(&mut self) -> Result<(), DecodeError> {
        self.begin_value()?;
        self.expect_byte(b'{')?;
        self.scopes.push(Scope::Object { entries: 0 });
        self.path.push(PathSegment::Start);
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<(), DecodeError> {
        self.expect_byte(b'}')?;
        match self.scopes.pop() {
            Some(Scope::Object { .. }) => {}
            _ => return Err(self.syntax("unbalanced '}'")),
        }
        self.path.pop();
        self.end_value();
        Ok(())
    }

    pub fn begin_array(&mut self) -> Result<(), DecodeError> {
        self.begin_value()?;
        self.expect_byte(b'[')?;
        self.scopes.push(Scope::Array { entries: 0 });
        self.path.push(PathSegment::Start);
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), DecodeError> {
        self.expect_byte(b']')?;
        match self.scopes.pop() {
            Some(Scope::Array { .. }) => {}
            _ => return Err(self.syntax("unbalanced ']'")),
        }
        self.path.pop();
        self.end_value();
        Ok(())
    }

    /// True while the enclosing object or array has more members.
    pub fn has_next(&mut self) -> Result<bool, DecodeError> {
        let b = self.peek_byte()?;
        Ok(b != b'}' && b != b']')
    }

    /// Reads a member name and its `:` separator.
    pub fn next_name(&mut self) -> Result<String, DecodeError> {
        let entries = match self.scopes.last() {
            Some(&Scope::Object { entries }) => entries,
            _ => return Err(self.syntax("member name outside of an object")),
        };
        if entries > 0 {
            self.expect_byte(b',')?;
        }
        self.skip_whitespace();
        let name = self.read_string()?;
        if let Some(last) = self.path.last_mut() {
            *last = PathSegment::Key(name.clone());
        }
        self.expect_byte(b':')?;
        Ok(name)
    }

    pub fn next_string(&mut self) -> Result<String, DecodeError> {
        self.begin_value()?;
        self.skip_whitespace();
        let value = self.read_string()?;
        self.end_value();
        Ok(value)
    }

    /// Reads an integer token. Decimal or exponent forms are rejected rather
    /// than truncated.
    pub fn next_long(&mut self) -> Result<i64, DecodeError> {
        self.begin_value()?;
        let literal = self.read_number_literal()?;
        let value = literal
            .parse::<i64>()
            .map_err(|_| self.syntax(format!("expected integer, found {:?}", literal)))?;
        self.end_value();
        Ok(value)
    }

    pub fn next_int(&mut self) -> Result<i32, DecodeError> {
        self.begin_value()?;
        let literal = self.read_number_literal()?;
        let value = literal
            .parse::<i32>()
            .map_err(|_| self.syntax(format!("expected integer, found {:?}", literal)))?;
        self.end_value();
        Ok(value)
    }

    pub fn next_boolean(&mut self) -> Result<bool, DecodeError> {
        self.begin_value()?;
        self.skip_whitespace();
        let value = if self.eat_literal(b"true") {
            true
        } else if self.eat_literal(b"false") {
            false
        } else {
            return Err(self.syntax("expected boolean"));
        };
        self.end_value();
        Ok(value)
    }

    /// Non-consuming check for the `null` literal. Only meaningful right
    /// after `next_name`, in member-value position.
    pub fn peek_null(&mut self) -> bool {
        self.skip_whitespace();
        self.buf[self.pos..].starts_with(b"null")
    }

    /// Skips any value, scalar or nested, without materializing it.
    pub fn skip_value(&mut self) -> Result<(), DecodeError> {
        self.begin_value()?;
        self.skip_value_inner()?;
        self.end_value();
        Ok(())
    }

    fn skip_value_inner(&mut self) -> Result<(), DecodeError> {
        let b = self.peek_byte()?;
        match b {
            b'"' => {
                self.read_string()?;
            }
            b'{' | b'[' => {
                let close = if b == b'{' { b'}' } else { b']' };
                self.pos += 1;
                loop {
                    let c = self.peek_byte()?;
                    if c == close {
                        self.pos += 1;
                        break;
                    }
                    if c == b',' || c == b':' {
                        self.pos += 1;
                        continue;
                    }
                    self.skip_value_inner()?;
                }
            }
            _ => {
                if !self.eat_literal(b"null")
                    && !self.eat_literal(b"true")
                    && !self.eat_literal(b"false")
                {
                    self.read_number_literal()?;
                }
            }
        }
        Ok(())
    }

    // Comma and path bookkeeping before a value in array position.
    fn begin_value(&mut self) -> Result<(), DecodeError> {
        let index = match self.scopes.last() {
            Some(&Scope::Array { entries }) => Some(entries),
            _ => None,
        };
        if let Some(index) = index {
            if index > 0 {
                self.expect_byte(b',')?;
            }
            if let Some(last) = self.path.last_mut() {
                *last = PathSegment::Index(index);
            }
        }
        Ok(())
    }

    fn end_value(&mut self) {
        match self.scopes.last_mut() {
            Some(Scope::Array { entries }) | Some(Scope::Object { entries }) => *entries += 1,
            None => {}
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&b) = self.buf.get(self.pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn peek_byte(&mut self) -> Result<u8, DecodeError> {
        self.skip_whitespace();
        match self.buf.get(self.pos) {
            Some(&b) => Ok(b),
            None => Err(self.eof()),
        }
    }

    fn expect_byte(&mut self, expected: u8) -> Result<(), DecodeError> {
        let b = self.peek_byte()?;
        if b != expected {
            return Err(self.syntax(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn eat_literal(&mut self, literal: &[u8]) -> bool {
        if self.buf[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        self.expect_byte(b'"')?;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let b = match self.buf.get(self.pos) {
                Some(&b) => b,
                None => return Err(self.eof()),
            };
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let c = self.read_escape()?;
                    let mut utf8 = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                }
                _ => out.push(b),
            }
        }
        String::from_utf8(out).map_err(|_| self.syntax("invalid utf-8 in string"))
    }

    fn read_escape(&mut self) -> Result<char, DecodeError> {
        let b = match self.buf.get(self.pos) {
            Some(&b) => b,
            None => return Err(self.eof()),
        };
        self.pos += 1;
        match b {
            b'"' => Ok('"'),
            b'\\' => Ok('\\'),
            b'/' => Ok('/'),
            b'b' => Ok('\u{0008}'),
            b'f' => Ok('\u{000C}'),
            b'n' => Ok('\n'),
            b'r' => Ok('\r'),
            b't' => Ok('\t'),
            b'u' => self.read_unicode_escape(),
            _ => Err(self.syntax(format!("invalid escape sequence '\\{}'", b as char))),
        }
    }

    fn read_unicode_escape(&mut self) -> Result<char, DecodeError> {
        let high = self.read_hex4()?;
        if high >= 0xD800 && high <= 0xDBFF {
            // UTF-16 surrogate pair, the low half must follow immediately
            if self.buf.get(self.pos) == Some(&b'\\') && self.buf.get(self.pos + 1) == Some(&b'u') {
                self.pos += 2;
                let low = self.read_hex4()?;
                if low >= 0xDC00 && low <= 0xDFFF {
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return std::char::from_u32(code)
                        .ok_or_else(|| self.syntax("invalid unicode escape"));
                }
            }
            return Err(self.syntax("unpaired surrogate in unicode escape"));
        }
        std::char::from_u32(high).ok_or_else(|| self.syntax("invalid unicode escape"))
    }

    fn read_hex4(&mut self) -> Result<u32, DecodeError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let b = match self.buf.get(self.pos) {
                Some(&b) => b,
                None => return Err(self.eof()),
            };
            self.pos += 1;
            let digit = match b {
                b'0'..=b'9' => u32::from(b - b'0'),
                b'a'..=b'f' => u32::from(b - b'a') + 10,
                b'A'..=b'F' => u32::from(b - b'A') + 10,
                _ => return Err(self.syntax("invalid unicode escape")),
            };
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn read_number_literal(&mut self) -> Result<String, DecodeError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(&b) = self.buf.get(self.pos) {
            match b {
                b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E' => self.pos += 1,
                _ => break,
            }
        }
        if start == self.pos {
            return Err(self.syntax("expected number"));
        }
        let literal = String::from_utf8_lossy(&self.buf[start..self.pos]).into_owned();
        if !integer_part_is_well_formed(&self.buf[start..self.pos]) {
            return Err(self.syntax(format!("malformed number {:?}", literal)));
        }
        Ok(literal)
    }

    fn syntax(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::Syntax {
            message: message.into(),
            path: self.path(),
        }
    }

    fn eof(&self) -> DecodeError {
        DecodeError::Eof { path: self.path() }
    }
}

/// JSON numbers start with an optional `-`, then a single `0` or a nonzero
/// digit. Leading `+` and leading zeros are not valid JSON.
fn integer_part_is_well_formed(literal: &[u8]) -> bool {
    let digits = match literal.split_first() {
        Some((b'-', rest)) => rest,
        _ => literal,
    };
    match digits.split_first() {
        Some((b'0', rest)) => !matches!(rest.first(), Some(b'0'..=b'9')),
        Some((b'1'..=b'9', _)) => true,
        _ => false,
    }
}
