use super::mutf8;
use super::reader::ClassReader;
use super::writer::ClassWriter;
use super::ClassParseError;
use std::collections::HashMap;

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELD_REF: u8 = 9;
pub const TAG_METHOD_REF: u8 = 10;
pub const TAG_INTERFACE_METHOD_REF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

/// `reference_kind` of a `REF_invokeStatic` method handle.
pub const REF_INVOKE_STATIC: u8 = 6;

const MAX_ENTRIES: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Raw modified UTF-8 bytes, kept as read so untouched entries are
    /// written back unchanged.
    Utf8(Vec<u8>),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    /// Slot 0 and the slot following a long or double.
    Unusable,
}

impl Constant {
    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// A class file's constant pool. Indices are stable: entries are never
/// removed or renumbered, only appended or replaced in place.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    utf8_lookup: HashMap<Vec<u8>, u16>,
    name_and_type_lookup: HashMap<(u16, u16), u16>,
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ConstantPool {}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
            ..Self::default()
        }
    }

    pub(crate) fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut pool = ConstantPool::new();
        pool.entries.reserve(count);

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                TAG_UTF8 => {
                    let length = reader.read_u2()? as usize;
                    Constant::Utf8(reader.read_slice(length)?.to_vec())
                }
                TAG_INTEGER => Constant::Integer(reader.read_u4()?),
                TAG_FLOAT => Constant::Float(reader.read_u4()?),
                TAG_LONG => Constant::Long(reader.read_u8()?),
                TAG_DOUBLE => Constant::Double(reader.read_u8()?),
                TAG_CLASS => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                TAG_STRING => Constant::String {
                    string_index: reader.read_u2()?,
                },
                TAG_FIELD_REF => Constant::FieldRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                TAG_METHOD_REF => Constant::MethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                TAG_INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    reference_kind: reader.read_u1()?,
                    reference_index: reader.read_u2()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor_index: reader.read_u2()?,
                },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                TAG_MODULE => Constant::Module {
                    name_index: reader.read_u2()?,
                },
                TAG_PACKAGE => Constant::Package {
                    name_index: reader.read_u2()?,
                },
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            let wide = entry.is_wide();
            pool.record(index as u16, &entry);
            pool.entries.push(entry);
            index += 1;
            if wide {
                pool.entries.push(Constant::Unusable);
                index += 1;
            }
        }

        if pool.entries.len() != count.max(1) {
            // a wide constant in the final slot overflows the declared count
            return Err(ClassParseError::InvalidConstantIndex { index: count as u16 });
        }
        Ok(pool)
    }

    pub(crate) fn write(&self, writer: &mut ClassWriter) -> Result<(), ClassParseError> {
        let count = self.entries.len();
        if count > MAX_ENTRIES {
            return Err(ClassParseError::TooManyConstants { count });
        }
        writer.put_u2(count as u16);
        for entry in &self.entries {
            match entry {
                Constant::Unusable => {}
                Constant::Utf8(bytes) => {
                    let length = u16::try_from(bytes.len())
                        .map_err(|_| ClassParseError::Utf8TooLong { length: bytes.len() })?;
                    writer.put_u1(TAG_UTF8);
                    writer.put_u2(length);
                    writer.put_bytes(bytes);
                }
                Constant::Integer(value) => {
                    writer.put_u1(TAG_INTEGER);
                    writer.put_u4(*value);
                }
                Constant::Float(value) => {
                    writer.put_u1(TAG_FLOAT);
                    writer.put_u4(*value);
                }
                Constant::Long(value) => {
                    writer.put_u1(TAG_LONG);
                    writer.put_u8(*value);
                }
                Constant::Double(value) => {
                    writer.put_u1(TAG_DOUBLE);
                    writer.put_u8(*value);
                }
                Constant::Class { name_index } => {
                    writer.put_u1(TAG_CLASS);
                    writer.put_u2(*name_index);
                }
                Constant::String { string_index } => {
                    writer.put_u1(TAG_STRING);
                    writer.put_u2(*string_index);
                }
                Constant::FieldRef {
                    class_index,
                    name_and_type_index,
                } => {
                    writer.put_u1(TAG_FIELD_REF);
                    writer.put_u2(*class_index);
                    writer.put_u2(*name_and_type_index);
                }
                Constant::MethodRef {
                    class_index,
                    name_and_type_index,
                } => {
                    writer.put_u1(TAG_METHOD_REF);
                    writer.put_u2(*class_index);
                    writer.put_u2(*name_and_type_index);
                }
                Constant::InterfaceMethodRef {
                    class_index,
                    name_and_type_index,
                } => {
                    writer.put_u1(TAG_INTERFACE_METHOD_REF);
                    writer.put_u2(*class_index);
                    writer.put_u2(*name_and_type_index);
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    writer.put_u1(TAG_NAME_AND_TYPE);
                    writer.put_u2(*name_index);
                    writer.put_u2(*descriptor_index);
                }
                Constant::MethodHandle {
                    reference_kind,
                    reference_index,
                } => {
                    writer.put_u1(TAG_METHOD_HANDLE);
                    writer.put_u1(*reference_kind);
                    writer.put_u2(*reference_index);
                }
                Constant::MethodType { descriptor_index } => {
                    writer.put_u1(TAG_METHOD_TYPE);
                    writer.put_u2(*descriptor_index);
                }
                Constant::Dynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    writer.put_u1(TAG_DYNAMIC);
                    writer.put_u2(*bootstrap_method_attr_index);
                    writer.put_u2(*name_and_type_index);
                }
                Constant::InvokeDynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    writer.put_u1(TAG_INVOKE_DYNAMIC);
                    writer.put_u2(*bootstrap_method_attr_index);
                    writer.put_u2(*name_and_type_index);
                }
                Constant::Module { name_index } => {
                    writer.put_u1(TAG_MODULE);
                    writer.put_u2(*name_index);
                }
                Constant::Package { name_index } => {
                    writer.put_u1(TAG_PACKAGE);
                    writer.put_u2(*name_index);
                }
            }
        }
        Ok(())
    }

    /// Number of slots including the unused slot 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn entries(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, entry)| (index as u16, entry))
    }

    pub fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => {
                Err(ClassParseError::InvalidConstantIndex { index })
            }
            Some(entry) => Ok(entry),
        }
    }

    /// Replace an existing entry. The replacement must keep the slot width.
    pub fn set(&mut self, index: u16, entry: Constant) -> Result<(), ClassParseError> {
        let slot = self
            .entries
            .get_mut(index as usize)
            .filter(|slot| !matches!(slot, Constant::Unusable))
            .ok_or(ClassParseError::InvalidConstantIndex { index })?;
        if slot.is_wide() != entry.is_wide() {
            return Err(ClassParseError::InvalidConstantIndex { index });
        }
        *slot = entry.clone();
        self.record(index, &entry);
        Ok(())
    }

    pub fn utf8(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(bytes) => {
                mutf8::decode(bytes).ok_or(ClassParseError::InvalidModifiedUtf8 { index })
            }
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    /// `(name, descriptor)` of a NameAndType entry.
    pub fn name_and_type(&self, index: u16) -> Result<(String, String), ClassParseError> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    /// `(owner, name, descriptor)` of a field, method or interface method ref.
    pub fn member_ref(&self, index: u16) -> Result<(String, String, String), ClassParseError> {
        match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            }
            | Constant::MethodRef {
                class_index,
                name_and_type_index,
            }
            | Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                let owner = self.class_name(*class_index)?;
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok((owner, name, descriptor))
            }
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    pub fn intern_utf8(&mut self, value: &str) -> Result<u16, ClassParseError> {
        let bytes = mutf8::encode(value);
        if let Some(index) = self.utf8_lookup.get(&bytes) {
            return Ok(*index);
        }
        self.push(Constant::Utf8(bytes))
    }

    pub fn intern_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassParseError> {
        let name_index = self.intern_utf8(name)?;
        let descriptor_index = self.intern_utf8(descriptor)?;
        if let Some(index) = self.name_and_type_lookup.get(&(name_index, descriptor_index)) {
            return Ok(*index);
        }
        self.push(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn intern_class(&mut self, name: &str) -> Result<u16, ClassParseError> {
        let name_index = self.intern_utf8(name)?;
        self.find_or_push(Constant::Class { name_index })
    }

    pub fn intern_string(&mut self, value: &str) -> Result<u16, ClassParseError> {
        let string_index = self.intern_utf8(value)?;
        self.find_or_push(Constant::String { string_index })
    }

    pub fn intern_field_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassParseError> {
        let class_index = self.intern_class(owner)?;
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        self.find_or_push(Constant::FieldRef {
            class_index,
            name_and_type_index,
        })
    }

    pub fn intern_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassParseError> {
        let class_index = self.intern_class(owner)?;
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        self.find_or_push(Constant::MethodRef {
            class_index,
            name_and_type_index,
        })
    }

    pub fn intern_interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassParseError> {
        let class_index = self.intern_class(owner)?;
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        self.find_or_push(Constant::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        })
    }

    pub fn intern_method_type(&mut self, descriptor: &str) -> Result<u16, ClassParseError> {
        let descriptor_index = self.intern_utf8(descriptor)?;
        self.find_or_push(Constant::MethodType { descriptor_index })
    }

    pub fn intern_method_handle(
        &mut self,
        reference_kind: u8,
        reference_index: u16,
    ) -> Result<u16, ClassParseError> {
        self.find_or_push(Constant::MethodHandle {
            reference_kind,
            reference_index,
        })
    }

    pub fn intern_invoke_dynamic(
        &mut self,
        bootstrap_method_attr_index: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ClassParseError> {
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        self.find_or_push(Constant::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn find_or_push(&mut self, entry: Constant) -> Result<u16, ClassParseError> {
        if let Some(position) = self.entries.iter().position(|existing| *existing == entry) {
            return Ok(position as u16);
        }
        self.push(entry)
    }

    fn push(&mut self, entry: Constant) -> Result<u16, ClassParseError> {
        let width = if entry.is_wide() { 2 } else { 1 };
        let index = self.entries.len();
        if index + width > MAX_ENTRIES {
            return Err(ClassParseError::TooManyConstants {
                count: index + width,
            });
        }
        self.record(index as u16, &entry);
        self.entries.push(entry);
        if width == 2 {
            self.entries.push(Constant::Unusable);
        }
        Ok(index as u16)
    }

    fn record(&mut self, index: u16, entry: &Constant) {
        match entry {
            Constant::Utf8(bytes) => {
                self.utf8_lookup.entry(bytes.clone()).or_insert(index);
            }
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => {
                self.name_and_type_lookup
                    .entry((*name_index, *descriptor_index))
                    .or_insert(index);
            }
            _ => {}
        }
    }
}
