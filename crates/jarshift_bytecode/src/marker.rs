//! Synthesised entry-point marker unit.
//!
//! The host loader only accepts archives that contain a class carrying its
//! mod annotation. The generated class is an empty public type with a no-arg
//! constructor, annotated with `value = <mod id>`.

use crate::classfile::{ClassBuilder, ClassParseError, ACC_PUBLIC, ACC_SUPER, JAVA_17};

const OBJECT: &str = "java/lang/Object";

/// Settings for the generated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpec<'a> {
    /// Package the marker class is placed under, in internal form.
    pub package: &'a str,
    /// Descriptor of the runtime-visible annotation, e.g.
    /// `Lnet/minecraftforge/fml/common/Mod;`.
    pub annotation: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClass {
    /// Archive entry name, `<internal name>.class`.
    pub entry_name: String,
    pub bytes: Vec<u8>,
}

/// Internal name of the marker class for `mod_id`.
pub fn marker_class_name(package: &str, mod_id: &str) -> String {
    let package = package.trim_matches('/');
    let id = mod_id.replace('-', "_");
    if package.is_empty() {
        format!("{id}/Mod")
    } else {
        format!("{package}/{id}/Mod")
    }
}

pub fn synthesize_marker(
    spec: &MarkerSpec<'_>,
    mod_id: &str,
) -> Result<MarkerClass, ClassParseError> {
    let name = marker_class_name(spec.package, mod_id);
    let mut builder = ClassBuilder::new(&name, Some(OBJECT))?
        .access(ACC_PUBLIC | ACC_SUPER)
        .version(JAVA_17);

    let object_init = builder.pool_mut().intern_method_ref(OBJECT, "<init>", "()V")?;
    let [high, low] = object_init.to_be_bytes();
    // aload_0; invokespecial Object.<init>; return
    let body = [0x2A, 0xB7, high, low, 0xB1];
    let code = builder.code(1, 1, &body, Vec::new())?;
    builder.add_method(ACC_PUBLIC, "<init>", "()V", vec![code])?;

    let annotation = {
        let pool = builder.pool_mut();
        let type_index = pool.intern_utf8(spec.annotation)?;
        let element_index = pool.intern_utf8("value")?;
        let value_index = pool.intern_utf8(mod_id)?;
        let mut info = Vec::with_capacity(11);
        info.extend_from_slice(&1u16.to_be_bytes());
        info.extend_from_slice(&type_index.to_be_bytes());
        info.extend_from_slice(&1u16.to_be_bytes());
        info.extend_from_slice(&element_index.to_be_bytes());
        info.push(b's');
        info.extend_from_slice(&value_index.to_be_bytes());
        info
    };
    let attribute = builder.attribute("RuntimeVisibleAnnotations", annotation)?;
    builder.add_attribute(attribute);

    Ok(MarkerClass {
        entry_name: format!("{name}.class"),
        bytes: builder.to_bytes()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{ClassFile, Constant};

    const SPEC: MarkerSpec<'static> = MarkerSpec {
        package: "jarshift/generated",
        annotation: "Lnet/minecraftforge/fml/common/Mod;",
    };

    #[test]
    fn class_name_replaces_dashes() {
        assert_eq!(
            marker_class_name("jarshift/generated/", "my-cool-mod"),
            "jarshift/generated/my_cool_mod/Mod"
        );
        assert_eq!(marker_class_name("", "abc"), "abc/Mod");
    }

    #[test]
    fn marker_is_a_public_annotated_java_17_class() {
        let marker = synthesize_marker(&SPEC, "my-mod").expect("marker");
        assert_eq!(marker.entry_name, "jarshift/generated/my_mod/Mod.class");

        let class = ClassFile::parse(&marker.bytes).expect("parse marker");
        assert_eq!(class.major_version, JAVA_17);
        assert_eq!(class.access_flags & ACC_PUBLIC, ACC_PUBLIC);
        assert_eq!(class.name().unwrap(), "jarshift/generated/my_mod/Mod");
        assert_eq!(class.super_name().unwrap().as_deref(), Some(OBJECT));
        assert_eq!(
            class.method_signatures().unwrap(),
            vec![("<init>".to_string(), "()V".to_string(), ACC_PUBLIC)]
        );

        let attribute = &class.attributes[0];
        assert_eq!(class.attribute_name(attribute).unwrap(), "RuntimeVisibleAnnotations");
        assert_eq!(attribute.info.len(), 11);
        assert_eq!(attribute.info[8], b's');
        let value_index = u16::from_be_bytes([attribute.info[9], attribute.info[10]]);
        assert_eq!(class.pool.utf8(value_index).unwrap(), "my-mod");
    }

    #[test]
    fn constructor_calls_object_init() {
        let marker = synthesize_marker(&SPEC, "m").unwrap();
        let class = ClassFile::parse(&marker.bytes).unwrap();
        let code = &class.methods[0].attributes[0].info;
        // max_stack, max_locals, code_length, then the body
        assert_eq!(&code[..8], &[0, 1, 0, 1, 0, 0, 0, 5]);
        assert_eq!(code[8], 0x2A);
        assert_eq!(code[9], 0xB7);
        let method = u16::from_be_bytes([code[10], code[11]]);
        assert!(matches!(class.pool.get(method), Ok(Constant::MethodRef { .. })));
        assert_eq!(
            class.pool.member_ref(method).unwrap(),
            (OBJECT.to_string(), "<init>".to_string(), "()V".to_string())
        );
    }
}
