use std::fmt;
use std::io::{self, Read};

const QUOTE: u8 = b'"';

/// A quoted field was still open when the input ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnclosedQuote {
    pub line: u64,
}

impl fmt::Display for UnclosedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quoted field opened on line {} is never closed", self.line)
    }
}

impl std::error::Error for UnclosedQuote {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    /// Saw a quote inside a quoted field: either `""` or the closing quote.
    QuoteInQuoted,
}

/// Passes bytes through while following field quoting the way the csv
/// reader does. A quote only opens a field when it is the field's first
/// byte. The reader would take an unclosed quote through to EOF, so this
/// fails the read instead.
pub struct QuoteGuard<R> {
    inner: R,
    delimiter: u8,
    state: State,
    line: u64,
    opened_on: u64,
}

impl<R> QuoteGuard<R> {
    pub fn new(inner: R, delimiter: u8) -> Self {
        Self {
            inner,
            delimiter,
            state: State::FieldStart,
            line: 1,
            opened_on: 1,
        }
    }

    fn scan(&mut self, buf: &[u8]) {
        for &byte in buf {
            let boundary = byte == self.delimiter || byte == b'\n' || byte == b'\r';

            self.state = match self.state {
                State::Quoted if byte == QUOTE => State::QuoteInQuoted,
                State::Quoted => State::Quoted,
                State::QuoteInQuoted if byte == QUOTE => State::Quoted,
                _ if boundary => State::FieldStart,
                State::FieldStart if byte == QUOTE => {
                    self.opened_on = self.line;
                    State::Quoted
                }
                _ => State::Unquoted,
            };

            if byte == b'\n' {
                self.line += 1;
            }
        }
    }
}

impl<R: Read> Read for QuoteGuard<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;

        if n == 0 && self.state == State::Quoted {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                UnclosedQuote {
                    line: self.opened_on,
                },
            ));
        }

        self.scan(&buf[..n]);
        Ok(n)
    }
}
