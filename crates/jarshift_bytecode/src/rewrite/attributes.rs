//! In-place remapping of attribute bodies.
//!
//! Only u2 constant-pool indices are swapped, so every attribute keeps its
//! length. Class indices need no patching here: `CONSTANT_Class` entries are
//! re-pointed in the pool itself.

use super::{method_name, RewriteContext, RewriteError};
use crate::classfile::reader::AttributeCursor;
use crate::classfile::ClassParseError;

impl<'r, 'p> RewriteContext<'r, 'p> {
    pub(super) fn rewrite_attribute_body(
        &mut self,
        name: &str,
        body: &mut [u8],
    ) -> Result<(), RewriteError> {
        let mut cursor = AttributeCursor::new(body);
        match name {
            "Signature" => {
                let (offset, signature) = self.read_utf8(&mut cursor)?;
                let mapped = self.signature(&signature)?;
                self.replace_utf8(&mut cursor, offset, &signature, &mapped)
            }
            "Code" => self.code(&mut cursor),
            "InnerClasses" => self.inner_classes(&mut cursor),
            "EnclosingMethod" => self.enclosing_method(&mut cursor),
            "Record" => self.record(&mut cursor),
            "LocalVariableTable" => self.local_variables(&mut cursor, false),
            "LocalVariableTypeTable" => self.local_variables(&mut cursor, true),
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                self.annotations(&mut cursor)
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let parameters = cursor.read_u1()?;
                for _ in 0..parameters {
                    self.annotations(&mut cursor)?;
                }
                Ok(())
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                self.type_annotations(&mut cursor)
            }
            "AnnotationDefault" => self.element_value(&mut cursor),
            _ => Ok(()),
        }
    }

    fn nested_attributes(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let count = cursor.read_u2()?;
        for _ in 0..count {
            let name_index = cursor.read_u2()?;
            let length = cursor.read_u4()? as usize;
            let name = self.original.utf8(name_index)?;
            let body = cursor.take_mut(length)?;
            self.rewrite_attribute_body(&name, body)?;
        }
        Ok(())
    }

    fn code(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        // max_stack, max_locals
        cursor.skip(4)?;
        let code_length = cursor.read_u4()? as usize;
        cursor.skip(code_length)?;
        let handlers = cursor.read_u2()? as usize;
        cursor.skip(handlers * 8)?;
        self.nested_attributes(cursor)
    }

    fn inner_classes(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let count = cursor.read_u2()?;
        for _ in 0..count {
            let inner_class = cursor.read_u2()?;
            cursor.skip(2)?;
            let name_offset = cursor.position();
            let inner_name = cursor.read_u2()?;
            cursor.skip(2)?;
            if inner_class == 0 || inner_name == 0 {
                continue;
            }

            let original = self.original.class_name(inner_class)?;
            let mapped_class = self.remapper.map_type(&original);
            if mapped_class == original {
                continue;
            }
            let simple = self.original.utf8(inner_name)?;
            let mapped_simple = simple_inner_name(mapped_class).unwrap_or(&simple).to_string();
            self.replace_utf8(cursor, name_offset, &simple, &mapped_simple)?;
        }
        Ok(())
    }

    fn enclosing_method(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let class_index = cursor.read_u2()?;
        let offset = cursor.position();
        let method_index = cursor.read_u2()?;
        if method_index == 0 {
            return Ok(());
        }
        let owner = self.original.class_name(class_index)?;
        let (name, descriptor) = self.original.name_and_type(method_index)?;
        let remapper = self.remapper;
        let mapped_name = method_name(&remapper, &owner, &name, &descriptor);
        let mapped_descriptor = self.descriptor(&descriptor)?;
        if let Some(index) =
            self.renamed_name_and_type(&name, &descriptor, mapped_name, &mapped_descriptor)?
        {
            cursor.patch_u2(offset, index)?;
        }
        Ok(())
    }

    fn record(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let components = cursor.read_u2()?;
        for _ in 0..components {
            let (name_offset, name) = self.read_utf8(cursor)?;
            let (descriptor_offset, descriptor) = self.read_utf8(cursor)?;
            let remapper = self.remapper;
            let mapped_name = remapper.map_field(self.class_name, &name, &descriptor);
            self.replace_utf8(cursor, name_offset, &name, mapped_name)?;
            let mapped_descriptor = self.descriptor(&descriptor)?;
            self.replace_utf8(cursor, descriptor_offset, &descriptor, &mapped_descriptor)?;
            self.nested_attributes(cursor)?;
        }
        Ok(())
    }

    fn local_variables(
        &mut self,
        cursor: &mut AttributeCursor<'_>,
        generic: bool,
    ) -> Result<(), RewriteError> {
        let count = cursor.read_u2()?;
        for _ in 0..count {
            // start_pc, length, name_index
            cursor.skip(6)?;
            let (offset, value) = self.read_utf8(cursor)?;
            let mapped = if generic {
                self.signature(&value)?
            } else {
                self.descriptor(&value)?
            };
            self.replace_utf8(cursor, offset, &value, &mapped)?;
            // index
            cursor.skip(2)?;
        }
        Ok(())
    }

    fn annotations(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let count = cursor.read_u2()?;
        for _ in 0..count {
            self.annotation(cursor)?;
        }
        Ok(())
    }

    fn annotation(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let (offset, descriptor) = self.read_utf8(cursor)?;
        let mapped = self.descriptor(&descriptor)?;
        self.replace_utf8(cursor, offset, &descriptor, &mapped)?;

        let owner = object_type(&descriptor);
        let pairs = cursor.read_u2()?;
        for _ in 0..pairs {
            let (offset, element) = self.read_utf8(cursor)?;
            let remapper = self.remapper;
            let mapped_element = method_name(&remapper, owner, &element, "");
            self.replace_utf8(cursor, offset, &element, mapped_element)?;
            self.element_value(cursor)?;
        }
        Ok(())
    }

    fn element_value(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        match cursor.read_u1()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => cursor.skip(2)?,
            b'e' => {
                let (type_offset, descriptor) = self.read_utf8(cursor)?;
                let (name_offset, constant) = self.read_utf8(cursor)?;
                let mapped_descriptor = self.descriptor(&descriptor)?;
                self.replace_utf8(cursor, type_offset, &descriptor, &mapped_descriptor)?;
                let remapper = self.remapper;
                let mapped_constant =
                    remapper.map_field(object_type(&descriptor), &constant, &descriptor);
                self.replace_utf8(cursor, name_offset, &constant, mapped_constant)?;
            }
            b'c' => {
                let (offset, descriptor) = self.read_utf8(cursor)?;
                if descriptor != "V" {
                    let mapped = self.descriptor(&descriptor)?;
                    self.replace_utf8(cursor, offset, &descriptor, &mapped)?;
                }
            }
            b'@' => self.annotation(cursor)?,
            b'[' => {
                let values = cursor.read_u2()?;
                for _ in 0..values {
                    self.element_value(cursor)?;
                }
            }
            tag => {
                return Err(ClassParseError::MalformedAttribute(format!(
                    "annotation (element tag {:#04x})",
                    tag
                ))
                .into())
            }
        }
        Ok(())
    }

    fn type_annotations(&mut self, cursor: &mut AttributeCursor<'_>) -> Result<(), RewriteError> {
        let count = cursor.read_u2()?;
        for _ in 0..count {
            let target_type = cursor.read_u1()?;
            let target_info = match target_type {
                0x00 | 0x01 | 0x16 => 1,
                0x10 | 0x11 | 0x12 | 0x17 | 0x42..=0x46 => 2,
                0x13..=0x15 => 0,
                0x47..=0x4B => 3,
                0x40 | 0x41 => {
                    let entries = cursor.read_u2()? as usize;
                    entries * 6
                }
                other => {
                    return Err(ClassParseError::MalformedAttribute(format!(
                        "type annotation (target {:#04x})",
                        other
                    ))
                    .into())
                }
            };
            cursor.skip(target_info)?;
            let path_length = cursor.read_u1()? as usize;
            cursor.skip(path_length * 2)?;
            self.annotation(cursor)?;
        }
        Ok(())
    }

    fn read_utf8(&self, cursor: &mut AttributeCursor<'_>) -> Result<(usize, String), RewriteError> {
        let offset = cursor.position();
        let index = cursor.read_u2()?;
        Ok((offset, self.original.utf8(index)?))
    }

    /// Point the u2 at `offset` to `mapped` if it differs from `original`.
    fn replace_utf8(
        &mut self,
        cursor: &mut AttributeCursor<'_>,
        offset: usize,
        original: &str,
        mapped: &str,
    ) -> Result<(), RewriteError> {
        if mapped == original {
            return Ok(());
        }
        let index = self.pool.intern_utf8(mapped)?;
        cursor.patch_u2(offset, index)?;
        self.changed = true;
        Ok(())
    }
}

/// Simple name of a nested class from its full binary name: the text after
/// the last `$`, with any local-class counter digits dropped.
fn simple_inner_name(binary_name: &str) -> Option<&str> {
    let (_, tail) = binary_name.rsplit_once('$')?;
    let simple = tail.trim_start_matches(|ch: char| ch.is_ascii_digit());
    if simple.is_empty() {
        None
    } else {
        Some(simple)
    }
}

fn object_type(descriptor: &str) -> &str {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or(descriptor)
}
