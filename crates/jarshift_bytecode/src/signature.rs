//! Generic signature remapping (the `Signature` attribute grammar).
//!
//! Class, method and field signatures share one parser: optional type
//! parameters, then either a parenthesised method signature or a sequence of
//! reference type signatures.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid generic signature `{signature}` at offset {offset}")]
pub struct SignatureError {
    pub signature: String,
    pub offset: usize,
}

pub fn remap_signature<F>(signature: &str, map_type: F) -> Result<String, SignatureError>
where
    F: FnMut(&str) -> String,
{
    let mut parser = SignatureParser {
        source: signature,
        pos: 0,
        out: String::with_capacity(signature.len()),
        map_type,
    };
    parser.parse_signature()?;
    Ok(parser.out)
}

struct SignatureParser<'a, F> {
    source: &'a str,
    pos: usize,
    out: String,
    map_type: F,
}

impl<'a, F> SignatureParser<'a, F>
where
    F: FnMut(&str) -> String,
{
    fn parse_signature(&mut self) -> Result<(), SignatureError> {
        if self.peek() == Some(b'<') {
            self.parse_type_parameters()?;
        }

        if self.peek() == Some(b'(') {
            self.copy(1);
            while self.peek() != Some(b')') {
                self.parse_java_type()?;
            }
            self.copy(1);
            if self.peek() == Some(b'V') {
                self.copy(1);
            } else {
                self.parse_java_type()?;
            }
            while self.peek() == Some(b'^') {
                self.copy(1);
                self.parse_reference_type()?;
            }
        } else {
            if self.at_end() {
                return Err(self.error());
            }
            while !self.at_end() {
                self.parse_reference_type()?;
            }
        }

        if !self.at_end() {
            return Err(self.error());
        }
        Ok(())
    }

    fn parse_type_parameters(&mut self) -> Result<(), SignatureError> {
        self.copy(1);
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.copy(1);
                    return Ok(());
                }
                Some(_) => {
                    let name_end = self.find(b':')?;
                    if name_end == self.pos {
                        return Err(self.error());
                    }
                    self.copy(name_end - self.pos);
                    // class bound (may be empty), then interface bounds
                    self.copy(1);
                    if !matches!(self.peek(), Some(b':') | Some(b'>')) {
                        self.parse_reference_type()?;
                    }
                    while self.peek() == Some(b':') {
                        self.copy(1);
                        self.parse_reference_type()?;
                    }
                }
                None => return Err(self.error()),
            }
        }
    }

    fn parse_java_type(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.copy(1);
                Ok(())
            }
            _ => self.parse_reference_type(),
        }
    }

    fn parse_reference_type(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b'L') => self.parse_class_type(),
            Some(b'T') => {
                let end = self.find(b';')?;
                self.copy(end + 1 - self.pos);
                Ok(())
            }
            Some(b'[') => {
                self.copy(1);
                self.parse_java_type()
            }
            _ => Err(self.error()),
        }
    }

    fn parse_class_type(&mut self) -> Result<(), SignatureError> {
        self.copy(1);
        let name = self.identifier()?;
        let mut class_name = name.to_string();
        let mapped = (self.map_type)(&class_name);
        self.out.push_str(&mapped);
        let mut mapped_outer = mapped;

        loop {
            match self.peek() {
                Some(b'<') => self.parse_type_arguments()?,
                Some(b'.') => {
                    self.copy(1);
                    let inner = self.identifier()?;
                    class_name.push('$');
                    class_name.push_str(inner);
                    let mapped_inner = (self.map_type)(&class_name);
                    let prefix = format!("{}$", mapped_outer);
                    let simple = match mapped_inner.strip_prefix(&prefix) {
                        Some(simple) => simple.to_string(),
                        None => match mapped_inner.rfind('$') {
                            Some(index) => mapped_inner[index + 1..].to_string(),
                            None => inner.to_string(),
                        },
                    };
                    self.out.push_str(&simple);
                    mapped_outer = mapped_inner;
                }
                Some(b';') => {
                    self.copy(1);
                    return Ok(());
                }
                _ => return Err(self.error()),
            }
        }
    }

    fn parse_type_arguments(&mut self) -> Result<(), SignatureError> {
        self.copy(1);
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.copy(1);
                    return Ok(());
                }
                Some(b'*') => self.copy(1),
                Some(b'+' | b'-') => {
                    self.copy(1);
                    self.parse_reference_type()?;
                }
                Some(_) => self.parse_reference_type()?,
                None => return Err(self.error()),
            }
        }
    }

    /// Identifier up to the next `<`, `.` or `;`, consumed without copying.
    fn identifier(&mut self) -> Result<&'a str, SignatureError> {
        let source = self.source;
        let rest = &source[self.pos..];
        let length = rest
            .find(|ch| matches!(ch, '<' | '.' | ';'))
            .ok_or_else(|| self.error())?;
        if length == 0 {
            return Err(self.error());
        }
        self.pos += length;
        Ok(&rest[..length])
    }

    fn find(&self, byte: u8) -> Result<usize, SignatureError> {
        self.source.as_bytes()[self.pos..]
            .iter()
            .position(|candidate| *candidate == byte)
            .map(|offset| self.pos + offset)
            .ok_or_else(|| self.error())
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn copy(&mut self, len: usize) {
        let end = (self.pos + len).min(self.source.len());
        self.out.push_str(&self.source[self.pos..end]);
        self.pos = end;
    }

    fn error(&self) -> SignatureError {
        SignatureError {
            signature: self.source.to_string(),
            offset: self.pos,
        }
    }
}
