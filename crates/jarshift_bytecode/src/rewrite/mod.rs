//! Compiled-unit rewriting.
//!
//! Every name-bearing reference of a class file is passed through the
//! [`SymbolRemapper`]. Existing constant-pool entries are never renumbered:
//! renamed references are re-pointed at appended (or already present)
//! entries, and attribute bodies only have their u2 pool indices patched. All
//! lookups read the pool as it was before rewriting started.

mod attributes;

use crate::classfile::{
    Attribute, ClassFile, ClassParseError, Constant, ConstantPool, Member,
};
use crate::classfile::reader::ClassReader;
use crate::remapper::SymbolRemapper;
use crate::signature::SignatureError;
use jarshift_mappings::descriptor::DescriptorError;
use thiserror::Error;
use tracing::trace;

const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("malformed class file: {0}")]
    Parse(#[from] ClassParseError),
    #[error("malformed descriptor in {class}: {source}")]
    Descriptor {
        class: String,
        #[source]
        source: DescriptorError,
    },
    #[error("malformed signature in {class}: {source}")]
    Signature {
        class: String,
        #[source]
        source: SignatureError,
    },
}

/// Result of rewriting one class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenClass {
    pub original_name: String,
    pub name: String,
    pub bytes: Vec<u8>,
    pub changed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassRewriter<'a> {
    remapper: SymbolRemapper<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BootstrapMethod {
    method_ref: u16,
    arguments: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Field,
    Method,
}

struct RewriteContext<'r, 'p> {
    remapper: SymbolRemapper<'r>,
    original: &'p ConstantPool,
    pool: &'p mut ConstantPool,
    class_name: &'p str,
    changed: bool,
}

impl<'a> ClassRewriter<'a> {
    pub fn new(remapper: SymbolRemapper<'a>) -> Self {
        Self { remapper }
    }

    /// Rewrite one class file. A class with nothing to rename is returned
    /// byte-for-byte unchanged.
    pub fn rewrite(&self, bytes: &[u8]) -> Result<RewrittenClass, RewriteError> {
        let mut class = ClassFile::parse(bytes)?;
        let original = class.pool.clone();
        let class_name = original.class_name(class.this_class)?;
        let bootstrap_methods = read_bootstrap_methods(&original, &class.attributes)?;

        let changed = {
            let mut context = RewriteContext {
                remapper: self.remapper,
                original: &original,
                pool: &mut class.pool,
                class_name: &class_name,
                changed: false,
            };
            context.rewrite_pool(&bootstrap_methods)?;
            for field in &mut class.fields {
                context.rewrite_member(field, MemberKind::Field)?;
            }
            for method in &mut class.methods {
                context.rewrite_member(method, MemberKind::Method)?;
            }
            context.rewrite_attributes(&mut class.attributes)?;
            context.changed
        };

        let name = class.name()?;
        let bytes = if changed {
            class.to_bytes()?
        } else {
            bytes.to_vec()
        };
        trace!(class = %class_name, renamed = %name, changed, "rewrote class");
        Ok(RewrittenClass {
            original_name: class_name,
            name,
            bytes,
            changed,
        })
    }
}

impl<'r, 'p> RewriteContext<'r, 'p> {
    fn rewrite_pool(&mut self, bootstrap_methods: &[BootstrapMethod]) -> Result<(), RewriteError> {
        let original = self.original;
        let remapper = self.remapper;
        for (index, entry) in original.entries() {
            match entry {
                Constant::Class { name_index } => {
                    let name = original.utf8(*name_index)?;
                    let mapped = self
                        .remapper
                        .map_class_reference(&name)
                        .map_err(|source| self.descriptor_error(source))?;
                    if mapped != name {
                        let name_index = self.pool.intern_utf8(&mapped)?;
                        self.pool.set(index, Constant::Class { name_index })?;
                        self.changed = true;
                    }
                }
                Constant::FieldRef {
                    class_index,
                    name_and_type_index,
                } => {
                    let owner = original.class_name(*class_index)?;
                    let (name, descriptor) = original.name_and_type(*name_and_type_index)?;
                    let mapped_name = remapper.map_field(&owner, &name, &descriptor);
                    let mapped_descriptor = self.descriptor(&descriptor)?;
                    if let Some(name_and_type_index) =
                        self.renamed_name_and_type(&name, &descriptor, mapped_name, &mapped_descriptor)?
                    {
                        self.pool.set(
                            index,
                            Constant::FieldRef {
                                class_index: *class_index,
                                name_and_type_index,
                            },
                        )?;
                    }
                }
                Constant::MethodRef {
                    class_index,
                    name_and_type_index,
                }
                | Constant::InterfaceMethodRef {
                    class_index,
                    name_and_type_index,
                } => {
                    let owner = original.class_name(*class_index)?;
                    let (name, descriptor) = original.name_and_type(*name_and_type_index)?;
                    let mapped_name = method_name(&remapper, &owner, &name, &descriptor);
                    let mapped_descriptor = self.descriptor(&descriptor)?;
                    if let Some(name_and_type_index) =
                        self.renamed_name_and_type(&name, &descriptor, mapped_name, &mapped_descriptor)?
                    {
                        let replacement = match entry {
                            Constant::MethodRef { .. } => Constant::MethodRef {
                                class_index: *class_index,
                                name_and_type_index,
                            },
                            _ => Constant::InterfaceMethodRef {
                                class_index: *class_index,
                                name_and_type_index,
                            },
                        };
                        self.pool.set(index, replacement)?;
                    }
                }
                Constant::MethodType { descriptor_index } => {
                    let descriptor = original.utf8(*descriptor_index)?;
                    let mapped = self.descriptor(&descriptor)?;
                    if mapped != descriptor {
                        let descriptor_index = self.pool.intern_utf8(&mapped)?;
                        self.pool.set(index, Constant::MethodType { descriptor_index })?;
                        self.changed = true;
                    }
                }
                Constant::InvokeDynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    let (name, descriptor) = original.name_and_type(*name_and_type_index)?;
                    let mapped_descriptor = self.descriptor(&descriptor)?;
                    let bootstrap = bootstrap_methods
                        .get(*bootstrap_method_attr_index as usize)
                        .ok_or_else(|| {
                            ClassParseError::MalformedAttribute("BootstrapMethods".to_string())
                        })?;
                    let implemented = lambda_target(original, bootstrap, &descriptor)?;
                    let mapped_name = match &implemented {
                        Some((owner, implemented_descriptor)) => {
                            remapper.map_method(owner, &name, implemented_descriptor)
                        }
                        None => name.as_str(),
                    };
                    if let Some(name_and_type_index) =
                        self.renamed_name_and_type(&name, &descriptor, mapped_name, &mapped_descriptor)?
                    {
                        self.pool.set(
                            index,
                            Constant::InvokeDynamic {
                                bootstrap_method_attr_index: *bootstrap_method_attr_index,
                                name_and_type_index,
                            },
                        )?;
                    }
                }
                Constant::Dynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    let (name, descriptor) = original.name_and_type(*name_and_type_index)?;
                    let mapped_descriptor = self.descriptor(&descriptor)?;
                    if let Some(name_and_type_index) =
                        self.renamed_name_and_type(&name, &descriptor, &name, &mapped_descriptor)?
                    {
                        self.pool.set(
                            index,
                            Constant::Dynamic {
                                bootstrap_method_attr_index: *bootstrap_method_attr_index,
                                name_and_type_index,
                            },
                        )?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn rewrite_member(&mut self, member: &mut Member, kind: MemberKind) -> Result<(), RewriteError> {
        let name = self.original.utf8(member.name_index)?;
        let descriptor = self.original.utf8(member.descriptor_index)?;
        let class_name = self.class_name;
        let remapper = self.remapper;
        let mapped_name = match kind {
            MemberKind::Field => remapper.map_field(class_name, &name, &descriptor),
            MemberKind::Method => method_name(&remapper, class_name, &name, &descriptor),
        };
        if mapped_name != name {
            member.name_index = self.pool.intern_utf8(mapped_name)?;
            self.changed = true;
        }
        let mapped_descriptor = self.descriptor(&descriptor)?;
        if mapped_descriptor != descriptor {
            member.descriptor_index = self.pool.intern_utf8(&mapped_descriptor)?;
            self.changed = true;
        }
        self.rewrite_attributes(&mut member.attributes)
    }

    fn rewrite_attributes(&mut self, attributes: &mut [Attribute]) -> Result<(), RewriteError> {
        for attribute in attributes {
            let name = self.original.utf8(attribute.name_index)?;
            self.rewrite_attribute_body(&name, &mut attribute.info)?;
        }
        Ok(())
    }

    fn descriptor(&self, value: &str) -> Result<String, RewriteError> {
        self.remapper
            .map_descriptor(value)
            .map_err(|source| self.descriptor_error(source))
    }

    fn signature(&self, value: &str) -> Result<String, RewriteError> {
        self.remapper
            .map_signature(value)
            .map_err(|source| RewriteError::Signature {
                class: self.class_name.to_string(),
                source,
            })
    }

    fn descriptor_error(&self, source: DescriptorError) -> RewriteError {
        RewriteError::Descriptor {
            class: self.class_name.to_string(),
            source,
        }
    }

    /// Intern a NameAndType for the renamed pair, or `None` when nothing
    /// changed.
    fn renamed_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
        mapped_name: &str,
        mapped_descriptor: &str,
    ) -> Result<Option<u16>, RewriteError> {
        if mapped_name == name && mapped_descriptor == descriptor {
            return Ok(None);
        }
        self.changed = true;
        Ok(Some(
            self.pool
                .intern_name_and_type(mapped_name, mapped_descriptor)?,
        ))
    }
}

/// Constructors and static initialisers are never renamed.
fn method_name<'s>(
    remapper: &'s SymbolRemapper<'_>,
    owner: &'s str,
    name: &'s str,
    descriptor: &str,
) -> &'s str {
    if name.starts_with('<') {
        return name;
    }
    remapper.map_method(owner, name, descriptor)
}

fn read_bootstrap_methods(
    pool: &ConstantPool,
    attributes: &[Attribute],
) -> Result<Vec<BootstrapMethod>, ClassParseError> {
    for attribute in attributes {
        if pool.utf8(attribute.name_index)? != "BootstrapMethods" {
            continue;
        }
        let mut reader = ClassReader::new(&attribute.info);
        let count = reader.read_u2()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let method_ref = reader.read_u2()?;
            let argument_count = reader.read_u2()?;
            let mut arguments = Vec::with_capacity(argument_count as usize);
            for _ in 0..argument_count {
                arguments.push(reader.read_u2()?);
            }
            methods.push(BootstrapMethod {
                method_ref,
                arguments,
            });
        }
        return Ok(methods);
    }
    Ok(Vec::new())
}

/// For a lambda call site, the functional interface type (return type of the
/// call-site descriptor) and the erased descriptor of the method it
/// implements (the first bootstrap argument).
fn lambda_target(
    pool: &ConstantPool,
    bootstrap: &BootstrapMethod,
    call_site_descriptor: &str,
) -> Result<Option<(String, String)>, ClassParseError> {
    let Constant::MethodHandle {
        reference_index, ..
    } = pool.get(bootstrap.method_ref)?
    else {
        return Err(ClassParseError::MalformedAttribute(
            "BootstrapMethods".to_string(),
        ));
    };
    let (owner, name, _) = pool.member_ref(*reference_index)?;
    if owner != LAMBDA_METAFACTORY || !matches!(name.as_str(), "metafactory" | "altMetafactory") {
        return Ok(None);
    }

    let Some(first) = bootstrap.arguments.first() else {
        return Ok(None);
    };
    let Constant::MethodType { descriptor_index } = pool.get(*first)? else {
        return Ok(None);
    };
    let implemented_descriptor = pool.utf8(*descriptor_index)?;

    let interface = call_site_descriptor
        .rsplit_once(')')
        .and_then(|(_, result)| result.strip_prefix('L'))
        .and_then(|result| result.strip_suffix(';'));
    Ok(interface.map(|interface| (interface.to_string(), implemented_descriptor)))
}
