use super::ClassParseError;

/// Big-endian cursor over class-file bytes.
pub(crate) struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub(crate) fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFEBABE;
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u64, ClassParseError> {
        let high = u64::from(self.read_u4()?);
        let low = u64::from(self.read_u4()?);
        Ok((high << 32) | low)
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

/// Writes u2 values in place inside an attribute body.
///
/// Rewritten attributes only ever swap constant-pool indices, so their
/// length never changes and patching in place is sufficient.
pub(crate) struct AttributeCursor<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> AttributeCursor<'a> {
    pub(crate) fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let high = self.read_u1()?;
        let low = self.read_u1()?;
        Ok(u16::from_be_bytes([high, low]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let high = self.read_u2()?;
        let low = self.read_u2()?;
        Ok((u32::from(high) << 16) | u32::from(low))
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos = end;
        Ok(())
    }

    /// Overwrite the u2 at `offset`.
    pub(crate) fn patch_u2(&mut self, offset: usize, value: u16) -> Result<(), ClassParseError> {
        let slot = self
            .data
            .get_mut(offset..offset + 2)
            .ok_or(ClassParseError::UnexpectedEof)?;
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Mutable view of the next `len` bytes, advancing past them.
    pub(crate) fn take_mut(&mut self, len: usize) -> Result<&mut [u8], ClassParseError> {
        let start = self.pos;
        self.skip(len)?;
        Ok(&mut self.data[start..start + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_values() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x3D, 0x07];
        let mut reader = ClassReader::new(&data);
        reader.expect_magic().expect("magic");
        assert_eq!(reader.read_u2().unwrap(), 61);
        assert_eq!(reader.read_u1().unwrap(), 7);
        assert!(matches!(reader.read_u1(), Err(ClassParseError::UnexpectedEof)));
    }

    #[test]
    fn slice_past_end_is_eof() {
        let data = [0u8; 3];
        let mut reader = ClassReader::new(&data);
        assert!(matches!(reader.read_slice(4), Err(ClassParseError::UnexpectedEof)));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn cursor_patches_in_place() {
        let mut data = [0x00, 0x01, 0x00, 0x02];
        let mut cursor = AttributeCursor::new(&mut data);
        assert_eq!(cursor.read_u2().unwrap(), 1);
        cursor.patch_u2(2, 0x0304).unwrap();
        assert_eq!(cursor.read_u2().unwrap(), 0x0304);
        assert!(cursor.patch_u2(3, 1).is_err());
    }
}
