/// Big-endian output buffer, the counterpart of the class reader.
#[derive(Debug, Default)]
pub(crate) struct ClassWriter {
    data: Vec<u8>,
}

impl ClassWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn put_u1(&mut self, value: u8) {
        self.data.push(value);
    }

    pub(crate) fn put_u2(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn put_u4(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn put_u8(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
