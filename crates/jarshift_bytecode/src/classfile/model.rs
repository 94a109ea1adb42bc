use super::constant::ConstantPool;
use super::reader::ClassReader;
use super::writer::ClassWriter;
use super::ClassParseError;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;

/// Class-file major version of Java 17.
pub const JAVA_17: u16 = 61;

/// An attribute with its body kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl Attribute {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }
}

/// A field or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

impl Member {
    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }
}

/// A fully parsed class file. Parsing then writing an unmodified value
/// reproduces the input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<Attribute>,
}

/// The part of a class file the hierarchy index needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub access_flags: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassParseError> {
        let mut reader = ClassReader::new(bytes);
        reader.expect_magic()?;
        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let pool = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;
        let interfaces_count = reader.read_u2()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(reader.read_u2()?);
        }

        let fields = read_members(&mut reader)?;
        let methods = read_members(&mut reader)?;
        let attributes = read_attributes(&mut reader)?;

        if reader.remaining() != 0 {
            return Err(ClassParseError::TrailingBytes {
                count: reader.remaining(),
            });
        }

        let class = Self {
            minor_version,
            major_version,
            pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        class.name()?;
        Ok(class)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassParseError> {
        let mut writer = ClassWriter::with_capacity(1024);
        writer.put_u4(0xCAFEBABE);
        writer.put_u2(self.minor_version);
        writer.put_u2(self.major_version);
        self.pool.write(&mut writer)?;
        writer.put_u2(self.access_flags);
        writer.put_u2(self.this_class);
        writer.put_u2(self.super_class);
        put_count(&mut writer, self.interfaces.len())?;
        for interface in &self.interfaces {
            writer.put_u2(*interface);
        }
        write_members(&mut writer, &self.fields)?;
        write_members(&mut writer, &self.methods)?;
        write_attributes(&mut writer, &self.attributes)?;
        Ok(writer.into_bytes())
    }

    pub fn name(&self) -> Result<String, ClassParseError> {
        self.pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<String>, ClassParseError> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<String>, ClassParseError> {
        self.interfaces
            .iter()
            .map(|index| self.pool.class_name(*index))
            .collect()
    }

    /// `(name, descriptor, access_flags)` for every declared field.
    pub fn field_signatures(&self) -> Result<Vec<(String, String, u16)>, ClassParseError> {
        self.member_signatures(&self.fields)
    }

    /// `(name, descriptor, access_flags)` for every declared method.
    pub fn method_signatures(&self) -> Result<Vec<(String, String, u16)>, ClassParseError> {
        self.member_signatures(&self.methods)
    }

    pub fn attribute_name(&self, attribute: &Attribute) -> Result<String, ClassParseError> {
        self.pool.utf8(attribute.name_index)
    }

    fn member_signatures(
        &self,
        members: &[Member],
    ) -> Result<Vec<(String, String, u16)>, ClassParseError> {
        members
            .iter()
            .map(|member| {
                Ok((
                    self.pool.utf8(member.name_index)?,
                    self.pool.utf8(member.descriptor_index)?,
                    member.access_flags,
                ))
            })
            .collect()
    }
}

/// Read only the constant pool and the header of a class file.
pub fn read_header(bytes: &[u8]) -> Result<ClassHeader, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;
    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(pool.class_name(reader.read_u2()?)?);
    }

    let super_name = if super_class == 0 {
        None
    } else {
        Some(pool.class_name(super_class)?)
    };

    Ok(ClassHeader {
        access_flags,
        name: pool.class_name(this_class)?,
        super_name,
        interfaces,
    })
}

fn read_members(reader: &mut ClassReader<'_>) -> Result<Vec<Member>, ClassParseError> {
    let count = reader.read_u2()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes = read_attributes(reader)?;
        members.push(Member {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
    }
    Ok(members)
}

pub(crate) fn read_attributes(
    reader: &mut ClassReader<'_>,
) -> Result<Vec<Attribute>, ClassParseError> {
    let count = reader.read_u2()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_slice(length)?.to_vec();
        attributes.push(Attribute { name_index, info });
    }
    Ok(attributes)
}

fn write_members(writer: &mut ClassWriter, members: &[Member]) -> Result<(), ClassParseError> {
    put_count(writer, members.len())?;
    for member in members {
        writer.put_u2(member.access_flags);
        writer.put_u2(member.name_index);
        writer.put_u2(member.descriptor_index);
        write_attributes(writer, &member.attributes)?;
    }
    Ok(())
}

pub(crate) fn write_attributes(
    writer: &mut ClassWriter,
    attributes: &[Attribute],
) -> Result<(), ClassParseError> {
    put_count(writer, attributes.len())?;
    for attribute in attributes {
        let length = u32::try_from(attribute.info.len()).map_err(|_| {
            ClassParseError::AttributeTooLong {
                length: attribute.info.len(),
            }
        })?;
        writer.put_u2(attribute.name_index);
        writer.put_u4(length);
        writer.put_bytes(&attribute.info);
    }
    Ok(())
}

fn put_count(writer: &mut ClassWriter, count: usize) -> Result<(), ClassParseError> {
    let count = u16::try_from(count).map_err(|_| ClassParseError::TooManyEntries { count })?;
    writer.put_u2(count);
    Ok(())
}
