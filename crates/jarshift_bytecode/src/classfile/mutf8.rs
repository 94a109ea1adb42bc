//! The JVM's "modified UTF-8": NUL is encoded as `C0 80` and supplementary
//! characters are written as two three-byte surrogate halves.

pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8. Returns `None` for malformed input, including
/// unpaired surrogates.
pub fn decode(bytes: &[u8]) -> Option<String> {
    if bytes.iter().all(|byte| (1..0x80).contains(byte)) {
        return String::from_utf8(bytes.to_vec()).ok();
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let first = bytes[pos];
        let unit = match first {
            0x01..=0x7F => {
                pos += 1;
                u16::from(first)
            }
            0xC0..=0xDF => {
                let second = continuation(bytes.get(pos + 1))?;
                pos += 2;
                (u16::from(first & 0x1F) << 6) | second
            }
            0xE0..=0xEF => {
                let second = continuation(bytes.get(pos + 1))?;
                let third = continuation(bytes.get(pos + 2))?;
                pos += 3;
                (u16::from(first & 0x0F) << 12) | (second << 6) | third
            }
            _ => return None,
        };
        units.push(unit);
    }

    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn continuation(byte: Option<&u8>) -> Option<u16> {
    match byte {
        Some(byte) if byte & 0xC0 == 0x80 => Some(u16::from(byte & 0x3F)),
        _ => None,
    }
}
