//! Structural rewriting of field and method descriptors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("invalid descriptor `{descriptor}` at offset {offset}")]
    Invalid { descriptor: String, offset: usize },
}

/// Rewrite every object type inside a field or method descriptor through
/// `map_type`. Primitive and array markers are copied unchanged.
pub fn remap_descriptor<F>(descriptor: &str, mut map_type: F) -> Result<String, DescriptorError>
where
    F: FnMut(&str) -> String,
{
    let mut parser = DescriptorParser::new(descriptor);
    let mut out = String::with_capacity(descriptor.len());

    if parser.peek() == Some(b'(') {
        parser.advance(1);
        out.push('(');
        while parser.peek() != Some(b')') {
            parser.parse_type(&mut out, &mut map_type, false)?;
        }
        parser.advance(1);
        out.push(')');
        parser.parse_type(&mut out, &mut map_type, true)?;
    } else {
        parser.parse_type(&mut out, &mut map_type, false)?;
    }

    if parser.remaining() != 0 {
        return Err(parser.error());
    }
    Ok(out)
}

/// True when `value` parses as a complete field or method descriptor.
pub fn is_descriptor(value: &str) -> bool {
    remap_descriptor(value, str::to_string).is_ok()
}

struct DescriptorParser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
    }

    fn remaining(&self) -> usize {
        self.source.len().saturating_sub(self.pos)
    }

    fn error(&self) -> DescriptorError {
        DescriptorError::Invalid {
            descriptor: self.source.to_string(),
            offset: self.pos,
        }
    }

    fn parse_type<F>(
        &mut self,
        out: &mut String,
        map_type: &mut F,
        allow_void: bool,
    ) -> Result<(), DescriptorError>
    where
        F: FnMut(&str) -> String,
    {
        let mut allow_void = allow_void;
        loop {
            let Some(tag) = self.peek() else {
                return Err(self.error());
            };
            match tag {
                b'[' => {
                    out.push('[');
                    self.advance(1);
                    allow_void = false;
                }
                b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => {
                    out.push(tag as char);
                    self.advance(1);
                    return Ok(());
                }
                b'V' if allow_void => {
                    out.push('V');
                    self.advance(1);
                    return Ok(());
                }
                b'L' => {
                    let start = self.pos + 1;
                    let Some(length) = self.source[start..].find(';') else {
                        return Err(self.error());
                    };
                    if length == 0 {
                        return Err(self.error());
                    }
                    let name = &self.source[start..start + length];
                    out.push('L');
                    out.push_str(&map_type(name));
                    out.push(';');
                    self.pos = start + length + 1;
                    return Ok(());
                }
                _ => return Err(self.error()),
            }
        }
    }
}
