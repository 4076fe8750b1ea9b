//! Hand-written lexer for the mini-grammar ETSI GSM 07.07 uses inside a
//! single response line: strings, integers, ranges, and nested
//! parenthesised lists.
//!
//! Ported operation-for-operation from `gsmlib`'s `Parser` class
//! (`gsm_parser.cc`) rather than built on a combinator library: several
//! operations here are genuinely stateful across more than one token
//! (`parse_int_list`'s two-pass sizing) or need to report *where* in the
//! line they failed, which doesn't fit a combinator's all-or-nothing
//! parse step.
//!
//! A `Parser` owns an input line and a byte cursor into it. Every `parse_*`
//! method either advances the cursor and returns a value, or fails with
//! `ParseError` (which captures the cursor position and the untouched
//! remainder of the line) and leaves the cursor where it was.

use std::fmt;

/// Sentinel returned by [`Parser::parse_int`] for an omitted optional slot.
pub const NOT_SET: i64 = -1;

/// A parse failure, carrying enough context to build a decent error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What we expected (or a generic message) at the point of failure.
    pub reason: String,
    /// Byte offset into the original line where the failure was detected.
    pub position: usize,
    /// The full line being parsed, for context.
    pub line: String,
}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (at position {} of string '{}')",
            self.reason, self.position, self.line
        )
    }
}

type PResult<T> = Result<T, ParseError>;

/// An inclusive integer range, as found in e.g. `+CNMI=?` test responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub low: i64,
    pub high: i64,
}

/// A `(<parameter>,<range>)` pair, as found in `+CPWD=?`-style responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRange {
    pub parameter: String,
    pub range: IntRange,
}

/// A cursor-based parser over one AT response line (sans line ending).
pub struct Parser<'a> {
    s: &'a str,
    bytes: &'a [u8],
    i: usize,
}
impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Parser {
            s,
            bytes: s.as_bytes(),
            i: 0,
        }
    }

    fn err<T>(&self, pos: usize, reason: impl Into<String>) -> PResult<T> {
        Err(ParseError {
            reason: reason.into(),
            position: pos,
            line: self.s.to_string(),
        })
    }

    /// Consume and return the next byte, optionally skipping leading
    /// whitespace first. Returns `None` at end of string.
    fn next_char(&mut self, skip_whitespace: bool) -> Option<u8> {
        if skip_whitespace {
            while self.i < self.bytes.len() && (self.bytes[self.i] as char).is_whitespace() {
                self.i += 1;
            }
        }
        if self.i >= self.bytes.len() {
            return None;
        }
        let c = self.bytes[self.i];
        self.i += 1;
        Some(c)
    }

    /// Un-consume the last byte returned by `next_char`. May only be called
    /// once between `next_char` calls.
    fn put_back(&mut self) {
        if self.i > 0 {
            self.i -= 1;
        }
    }

    /// True if the cursor has no more input (ignoring trailing whitespace).
    pub fn at_eof(&self) -> bool {
        let mut j = self.i;
        while j < self.bytes.len() && (self.bytes[j] as char).is_whitespace() {
            j += 1;
        }
        j >= self.bytes.len()
    }

    /// Remaining, unparsed input.
    pub fn remaining(&self) -> &'a str {
        &self.s[self.i.min(self.s.len())..]
    }

    /// True (and cursor unchanged) if the next slot is empty, i.e. the next
    /// non-skipped character is `,` or end-of-line. If `allow_missing` is
    /// false, an empty slot is a parse error instead.
    fn check_empty(&mut self, allow_missing: bool) -> PResult<bool> {
        let pos = self.i;
        match self.next_char(true) {
            Some(b',') | None => {
                self.put_back();
                if allow_missing {
                    Ok(true)
                } else {
                    self.err(pos, "expected parameter")
                }
            }
            Some(_) => {
                self.put_back();
                Ok(false)
            }
        }
    }

    /// Parse a single expected character. Returns `true` if found and
    /// consumed; if not found and `allow_missing` is true, returns `false`
    /// without consuming; otherwise fails.
    pub fn parse_char(&mut self, c: char, allow_missing: bool) -> PResult<bool> {
        let pos = self.i;
        match self.next_char(true) {
            Some(b) if b == c as u8 => Ok(true),
            _ => {
                self.put_back();
                if allow_missing {
                    Ok(false)
                } else {
                    self.err(pos, format!("expected '{}'", c))
                }
            }
        }
    }

    /// Parse a comma separator.
    pub fn parse_comma(&mut self, allow_missing: bool) -> PResult<bool> {
        let pos = self.i;
        match self.next_char(true) {
            Some(b',') => Ok(true),
            _ => {
                self.put_back();
                if allow_missing {
                    Ok(false)
                } else {
                    self.err(pos, "expected comma")
                }
            }
        }
    }

    fn parse_int_raw(&mut self) -> PResult<i64> {
        let pos = self.i;
        let mut digits = String::new();
        loop {
            match self.next_char(false) {
                Some(c) if (c as char).is_ascii_digit() => digits.push(c as char),
                _ => {
                    self.put_back();
                    break;
                }
            }
        }
        if digits.is_empty() {
            return self.err(pos, "expected number");
        }
        digits
            .parse()
            .map_err(|_| ParseError {
                reason: "number out of range".into(),
                position: pos,
                line: self.s.to_string(),
            })
    }

    /// Parse a bare integer. If `optional` and the slot is empty, returns
    /// [`NOT_SET`] instead of failing.
    pub fn parse_int(&mut self, optional: bool) -> PResult<i64> {
        if self.check_empty(optional)? {
            return Ok(NOT_SET);
        }
        self.parse_int_raw()
    }

    /// Parse a `"quoted"` string, or (with `with_quotes_through_eol`) a
    /// quoted string that runs through end-of-line — used where the device
    /// embeds unescaped commas inside the payload.
    fn parse_string_raw(&mut self, with_quotes_through_eol: bool) -> PResult<String> {
        let mut result = String::new();
        if self.parse_char('"', true)? {
            if with_quotes_through_eol {
                while let Some(c) = self.next_char(false) {
                    result.push(c as char);
                }
                if !result.ends_with('"') {
                    let pos = self.i;
                    return self.err(pos, "expected '\"'");
                }
                result.pop();
            } else {
                loop {
                    match self.next_char(false) {
                        Some(b'"') => break,
                        Some(c) => result.push(c as char),
                        None => {
                            let pos = self.i;
                            return self.err(pos, "expected '\"'");
                        }
                    }
                }
            }
        } else {
            loop {
                match self.next_char(false) {
                    Some(b',') | Some(b')') => {
                        self.put_back();
                        break;
                    }
                    Some(c) => result.push(c as char),
                    None => break,
                }
            }
        }
        Ok(result)
    }

    /// Parse a string value, optionally empty (`allow_missing`) and
    /// optionally quoted-through-EOL (`with_quotes_through_eol`).
    pub fn parse_string(&mut self, allow_missing: bool, with_quotes_through_eol: bool) -> PResult<String> {
        if self.check_empty(allow_missing)? {
            return Ok(String::new());
        }
        self.parse_string_raw(with_quotes_through_eol)
    }

    /// Parse `(lo-hi)`, `lo-hi`, `(n)`, or `n`, canonicalised so `lo <= hi`.
    ///
    /// - `allow_non_range`: accept a bare integer with no `-hi` part (then
    ///   `low == high`).
    /// - `allow_no_parens`: accept the unparenthesised forms.
    pub fn parse_range(&mut self, allow_non_range: bool, allow_no_parens: bool) -> PResult<IntRange> {
        let expect_close = self.parse_char('(', allow_no_parens)?;
        let low = self.parse_int_raw()?;
        let mut high = low;
        // The '-' itself is always optional to look for; whether a *bare*
        // value (no '-hi' part) is actually legal is governed by
        // allow_non_range below, once we know it's missing.
        if self.parse_char('-', true)? {
            high = self.parse_int_raw()?;
        } else if !allow_non_range {
            let pos = self.i;
            return self.err(pos, "expected '-'");
        }
        if expect_close {
            self.parse_char(')', false)?;
        }
        if low > high {
            Ok(IntRange { low: high, high: low })
        } else {
            Ok(IntRange { low, high })
        }
    }

    /// Parse a comma- or bracket-separated list of strings:
    /// `("a","b","c")` or `"a","b","c"` (if `allow_no_parentheses`), or
    /// nothing at all (if `allow_no_list`, returning an empty `Vec`).
    pub fn parse_string_list(&mut self, allow_no_list: bool, allow_no_parentheses: bool) -> PResult<Vec<String>> {
        let mut result = vec![];
        if self.check_empty(allow_no_list)? {
            return Ok(result);
        }
        let expect_close = self.parse_char('(', allow_no_parentheses)?;
        match self.next_char(true) {
            Some(b')') => {}
            _ => {
                self.put_back();
                loop {
                    result.push(self.parse_string_raw(false)?);
                    let pos = self.i;
                    match self.next_char(true) {
                        Some(b')') => break,
                        None => {
                            if expect_close {
                                return self.err(pos, "unexpected end of string");
                            } else {
                                break;
                            }
                        }
                        Some(b',') => {}
                        Some(_) => return self.err(pos, "expected ')' or ','"),
                    }
                }
            }
        }
        Ok(result)
    }

    /// Parse a list of integers and/or ranges into a membership bitmap.
    ///
    /// Two passes: the first determines the highest value seen (to size the
    /// bitmap), the second fills it in. The returned `Vec<bool>` has length
    /// exactly `max(value) + 1`. Some TAs omit the parentheses when the list
    /// contains only a single value (`n` instead of `(n)`); that shortcut is
    /// handled before the general two-pass parse.
    pub fn parse_int_list(&mut self, allow_no_list: bool, allow_no_parentheses: bool) -> PResult<Vec<bool>> {
        let mut result = vec![];
        if self.check_empty(allow_no_list)? {
            return Ok(result);
        }

        let save_i = self.i;
        // Shortcut: a lone digit with no parentheses at all.
        let pos = self.i;
        if let Some(c) = self.next_char(true) {
            if (c as char).is_ascii_digit() {
                self.put_back();
                let n = self.parse_int_raw()? as usize;
                result.resize(n + 1, false);
                result[n] = true;
                return Ok(result);
            }
        }
        self.i = pos;

        let mut capacity: i64 = 0;
        for pass in 0..2 {
            self.i = save_i;
            if pass == 1 {
                result = vec![false; (capacity + 1) as usize];
            }
            let expect_close = self.parse_char('(', allow_no_parentheses)?;
            let next_pos = self.i;
            let closed_immediately = match self.next_char(true) {
                Some(b')') if expect_close => true,
                None if !expect_close => true,
                _ => {
                    self.i = next_pos;
                    false
                }
            };
            if !closed_immediately {
                let mut last: Option<i64> = None;
                let mut is_range = false;
                loop {
                    let this_int = self.parse_int_raw()?;
                    if is_range {
                        let prev = last.expect("is_range implies a previous value");
                        let (lo, hi) = if prev <= this_int { (prev, this_int) } else { (this_int, prev) };
                        for v in lo..hi {
                            if v > capacity {
                                capacity = v;
                            }
                            if pass == 1 {
                                result[v as usize] = true;
                            }
                        }
                        is_range = false;
                    }
                    if this_int > capacity {
                        capacity = this_int;
                    }
                    if pass == 1 {
                        result[this_int as usize] = true;
                    }
                    last = Some(this_int);

                    let sep_pos = self.i;
                    match self.next_char(true) {
                        Some(b')') if expect_close => break,
                        None if !expect_close => break,
                        None => return self.err(sep_pos, "unexpected end of string"),
                        Some(b',') => is_range = false,
                        Some(b'-') => {
                            if is_range {
                                return self.err(sep_pos, "range of the form a-b-c not allowed");
                            }
                            is_range = true;
                        }
                        Some(_) => return self.err(sep_pos, "expected ')', ',' or '-'"),
                    }
                }
                if is_range {
                    let pos = self.i;
                    return self.err(pos, "range of the form a- not allowed");
                }
            }
        }
        Ok(result)
    }

    /// Parse a `(<parameter>,<range>)` tuple.
    pub fn parse_parameter_range(&mut self, allow_missing: bool) -> PResult<Option<ParameterRange>> {
        if self.check_empty(allow_missing)? {
            return Ok(None);
        }
        self.parse_char('(', false)?;
        let parameter = self.parse_string(false, false)?;
        self.parse_comma(false)?;
        let range = self.parse_range(true, true)?;
        self.parse_char(')', false)?;
        Ok(Some(ParameterRange { parameter, range }))
    }

    /// Parse a comma-separated list of `(<parameter>,<range>)` tuples.
    pub fn parse_parameter_range_list(&mut self, allow_no_list: bool) -> PResult<Vec<ParameterRange>> {
        let mut result = vec![];
        if self.check_empty(allow_no_list)? {
            return Ok(result);
        }
        if let Some(pr) = self.parse_parameter_range(false)? {
            result.push(pr);
        }
        while self.parse_comma(true)? {
            if let Some(pr) = self.parse_parameter_range(false)? {
                result.push(pr);
            }
        }
        Ok(result)
    }

    /// Consume and return the rest of the line, verbatim.
    pub fn parse_eol(&mut self) -> String {
        let rest = self.remaining().to_string();
        self.i = self.bytes.len();
        rest
    }

    /// Like [`Parser::parse_eol`], but non-destructive: the cursor is left
    /// where it was.
    pub fn peek_eol(&self) -> &'a str {
        self.remaining()
    }

    /// Fail unless the cursor is at end-of-line.
    pub fn check_eol(&mut self) -> PResult<()> {
        let pos = self.i;
        if self.next_char(true).is_some() {
            self.put_back();
            return self.err(pos, "expected end of line");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_basic() {
        let mut p = Parser::new("9001");
        assert_eq!(p.parse_int(false).unwrap(), 9001);
        assert!(p.at_eof());
    }

    #[test]
    fn int_optional_empty() {
        let mut p = Parser::new(",next");
        assert_eq!(p.parse_int(true).unwrap(), NOT_SET);
        assert!(p.parse_comma(false).unwrap());
    }

    #[test]
    fn string_quoted() {
        let mut p = Parser::new("\"SM\"");
        assert_eq!(p.parse_string(false, false).unwrap(), "SM");
    }

    #[test]
    fn string_through_eol_strips_trailing_quote() {
        let mut p = Parser::new("\"hello, world\"");
        assert_eq!(p.parse_string(false, true).unwrap(), "hello, world");
    }

    #[test]
    fn range_reversed_is_normalised() {
        let mut p = Parser::new("5-3");
        let r = p.parse_range(true, true).unwrap();
        assert_eq!((r.low, r.high), (3, 5));
    }

    #[test]
    fn range_abc_is_illegal() {
        let mut p = Parser::new("(1-2-3)");
        assert!(p.parse_range(true, false).is_err());
    }

    #[test]
    fn int_list_scenario_range_then_list() {
        // "(0-4),(0,1)" -> parse_range then parse_comma then parse_int_list
        let mut p = Parser::new("(0-4),(0,1)");
        let r = p.parse_range(false, false).unwrap();
        assert_eq!((r.low, r.high), (0, 4));
        assert!(p.parse_comma(false).unwrap());
        let bitmap = p.parse_int_list(false, false).unwrap();
        assert_eq!(bitmap, vec![true, true]);
    }

    #[test]
    fn int_list_bare_shortcut() {
        let mut p = Parser::new("3");
        let bitmap = p.parse_int_list(false, true).unwrap();
        assert_eq!(bitmap, vec![false, false, false, true]);
    }

    #[test]
    fn int_list_trailing_dash_illegal() {
        let mut p = Parser::new("(1-2,3-)");
        assert!(p.parse_int_list(false, false).is_err());
    }

    #[test]
    fn int_list_cnmi_capability_example() {
        // +CNMI=? -> (0-3),(0-2),(0,2),(0-2),(0,1)
        let mut p = Parser::new("(0-3),(0-2),(0,2),(0-2),(0,1)");
        let modes = p.parse_int_list(false, false).unwrap();
        assert_eq!(modes, vec![true, true, true, true]);
        assert!(p.parse_comma(false).unwrap());
        let mt = p.parse_int_list(false, false).unwrap();
        assert_eq!(mt, vec![true, true, true]);
        assert!(p.parse_comma(false).unwrap());
        let bm = p.parse_int_list(false, false).unwrap();
        assert_eq!(bm, vec![true, false, true]);
    }

    #[test]
    fn cursor_never_overruns() {
        let mut p = Parser::new("abc");
        // parse_int will fail, but must not panic or move past the string.
        assert!(p.parse_int(false).is_err());
        assert!(!p.at_eof());
    }

    #[test]
    fn no_closing_paren_when_none_opened() {
        let mut p = Parser::new("1,2,3");
        let bitmap = p.parse_int_list(false, true).unwrap();
        assert_eq!(bitmap, vec![true, true, true, true]);
    }
}
