use super::constant::ConstantPool;
use super::model::{Attribute, ClassFile, Member, ACC_PUBLIC, ACC_SUPER, JAVA_17};
use super::writer::ClassWriter;
use super::ClassParseError;

/// Assembles class files from scratch.
///
/// Used for generated units and for building fixtures in tests.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    class: ClassFile,
}

impl ClassBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> Result<Self, ClassParseError> {
        let mut pool = ConstantPool::new();
        let this_class = pool.intern_class(name)?;
        let super_class = match super_name {
            Some(super_name) => pool.intern_class(super_name)?,
            None => 0,
        };
        Ok(Self {
            class: ClassFile {
                minor_version: 0,
                major_version: JAVA_17,
                pool,
                access_flags: ACC_PUBLIC | ACC_SUPER,
                this_class,
                super_class,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            },
        })
    }

    pub fn access(mut self, access_flags: u16) -> Self {
        self.class.access_flags = access_flags;
        self
    }

    pub fn version(mut self, major_version: u16) -> Self {
        self.class.major_version = major_version;
        self
    }

    pub fn pool_mut(&mut self) -> &mut ConstantPool {
        &mut self.class.pool
    }

    pub fn add_interface(&mut self, name: &str) -> Result<&mut Self, ClassParseError> {
        let index = self.class.pool.intern_class(name)?;
        self.class.interfaces.push(index);
        Ok(self)
    }

    pub fn add_field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Attribute>,
    ) -> Result<&mut Self, ClassParseError> {
        let member = self.member(access_flags, name, descriptor, attributes)?;
        self.class.fields.push(member);
        Ok(self)
    }

    pub fn add_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Attribute>,
    ) -> Result<&mut Self, ClassParseError> {
        let member = self.member(access_flags, name, descriptor, attributes)?;
        self.class.methods.push(member);
        Ok(self)
    }

    pub fn add_attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.class.attributes.push(attribute);
        self
    }

    /// An attribute named `name` with the given body.
    pub fn attribute(&mut self, name: &str, info: Vec<u8>) -> Result<Attribute, ClassParseError> {
        let name_index = self.class.pool.intern_utf8(name)?;
        Ok(Attribute::new(name_index, info))
    }

    /// A `Code` attribute with an empty exception table.
    pub fn code(
        &mut self,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
        attributes: Vec<Attribute>,
    ) -> Result<Attribute, ClassParseError> {
        let code_length = u32::try_from(code.len())
            .map_err(|_| ClassParseError::AttributeTooLong { length: code.len() })?;
        let mut writer = ClassWriter::with_capacity(code.len() + 12);
        writer.put_u2(max_stack);
        writer.put_u2(max_locals);
        writer.put_u4(code_length);
        writer.put_bytes(code);
        writer.put_u2(0);
        super::model::write_attributes(&mut writer, &attributes)?;
        self.attribute("Code", writer.into_bytes())
    }

    pub fn build(self) -> ClassFile {
        self.class
    }

    pub fn to_bytes(self) -> Result<Vec<u8>, ClassParseError> {
        self.class.to_bytes()
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Attribute>,
    ) -> Result<Member, ClassParseError> {
        Ok(Member {
            access_flags,
            name_index: self.class.pool.intern_utf8(name)?,
            descriptor_index: self.class.pool.intern_utf8(descriptor)?,
            attributes,
        })
    }
}
