//! Best-effort remapping of symbol names embedded in free text.
//!
//! Text artifacts (reference maps, access descriptors) carry symbol names as
//! plain strings with no structural guarantee about where a name starts or
//! ends. Values are handled in three tiers:
//!
//! 1. a whole value that is a bare type identifier is looked up exactly;
//! 2. a whole value shaped like a qualified member reference
//!    (`Lowner;name(desc)`, `Lowner;name:desc`, `owner.name(desc)`) is
//!    resolved with owner context;
//! 3. anything else is scanned for substrings matching [`SymbolPatterns`].
//!
//! Tier 3 has known false negatives: names that do not match the configured
//! patterns (for example already-readable names, or types referenced without
//! the `L...;` wrapper inside longer text) are left untouched.

use crate::descriptor;
use crate::table::MappingSet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use tracing::trace;

static DEFAULT_PATTERNS: Lazy<SymbolPatterns> = Lazy::new(|| SymbolPatterns {
    method: Regex::new(r"\bmethod_[0-9]+\b").expect("method pattern"),
    field: Regex::new(r"\bfield_[0-9]+\b").expect("field pattern"),
    type_descriptor: Regex::new(r"L([\w$/]+?class_[0-9]+);").expect("type descriptor pattern"),
    bare_type: Regex::new(r"^[\w$/]+class_[0-9]+$").expect("bare type pattern"),
});

/// Lexical shapes of source-namespace symbols.
#[derive(Debug, Clone)]
pub struct SymbolPatterns {
    method: Regex,
    field: Regex,
    type_descriptor: Regex,
    bare_type: Regex,
}

impl SymbolPatterns {
    /// `type_descriptor` must capture the internal type name in group 1.
    pub fn new(
        method: &str,
        field: &str,
        type_descriptor: &str,
        bare_type: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            method: Regex::new(method)?,
            field: Regex::new(field)?,
            type_descriptor: Regex::new(type_descriptor)?,
            bare_type: Regex::new(bare_type)?,
        })
    }

    pub fn is_bare_type(&self, value: &str) -> bool {
        self.bare_type.is_match(value)
    }
}

impl Default for SymbolPatterns {
    fn default() -> Self {
        DEFAULT_PATTERNS.clone()
    }
}

/// A qualified member reference split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MemberReference<'a> {
    owner: Option<&'a str>,
    wrapped_owner: bool,
    name: &'a str,
    separator: Option<char>,
    descriptor: &'a str,
}

impl<'a> MemberReference<'a> {
    fn parse(value: &'a str) -> Option<Self> {
        let (owner, wrapped_owner, rest) = if let Some(stripped) = value.strip_prefix('L') {
            match stripped.split_once(';') {
                Some((owner, rest)) if !owner.is_empty() => (Some(owner), true, rest),
                _ => (None, false, value),
            }
        } else {
            let name_end = value.find(&['(', ':'][..]).unwrap_or(value.len());
            match value[..name_end].rfind('.') {
                Some(dot) if value[..dot].contains('/') => {
                    (Some(&value[..dot]), false, &value[dot + 1..])
                }
                _ => (None, false, value),
            }
        };

        let split = rest.find(&['(', ':'][..]);
        let (name, separator, descriptor) = match split {
            Some(index) if rest.as_bytes()[index] == b':' => {
                (&rest[..index], Some(':'), &rest[index + 1..])
            }
            Some(index) => (&rest[..index], Some('('), &rest[index..]),
            None => (rest, None, ""),
        };

        if !owner.is_some_and(is_symbol_text) || !is_symbol_text(name) {
            return None;
        }
        if !descriptor.is_empty() && !descriptor::is_descriptor(descriptor) {
            return None;
        }
        Some(Self {
            owner,
            wrapped_owner,
            name,
            separator,
            descriptor,
        })
    }

    fn is_method(&self) -> bool {
        self.separator == Some('(')
    }
}

fn is_symbol_text(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '$' | '/' | '.' | '<' | '>' | '-'))
}

/// Applies a [`MappingSet`] to strings.
#[derive(Debug, Clone)]
pub struct TextRemapper<'a> {
    mappings: &'a MappingSet,
    patterns: SymbolPatterns,
}

impl<'a> TextRemapper<'a> {
    pub fn new(mappings: &'a MappingSet) -> Self {
        Self::with_patterns(mappings, SymbolPatterns::default())
    }

    pub fn with_patterns(mappings: &'a MappingSet, patterns: SymbolPatterns) -> Self {
        Self { mappings, patterns }
    }

    pub fn mappings(&self) -> &'a MappingSet {
        self.mappings
    }

    /// Exact type lookup. Dotted names are looked up in slashed form and
    /// returned dotted.
    pub fn remap_type_name(&self, name: &str) -> String {
        if name.contains('.') {
            let internal = name.replace('.', "/");
            return match self.mappings.symbols.map_type(&internal) {
                Some(target) => target.replace('/', "."),
                None => name.to_string(),
            };
        }
        self.mappings
            .symbols
            .map_type(name)
            .unwrap_or(name)
            .to_string()
    }

    pub fn remap_method_name(&self, name: &str) -> String {
        self.mappings
            .symbols
            .map_method(name)
            .unwrap_or(name)
            .to_string()
    }

    pub fn remap_field_name(&self, name: &str) -> String {
        self.mappings
            .symbols
            .map_field(name)
            .unwrap_or(name)
            .to_string()
    }

    /// Remap the object types inside a descriptor. Invalid descriptors are
    /// returned unchanged.
    pub fn remap_descriptor(&self, value: &str) -> String {
        match descriptor::remap_descriptor(value, |name| self.remap_type_name(name)) {
            Ok(remapped) => remapped,
            Err(err) => {
                trace!(value, error = %err, "leaving unparsable descriptor unchanged");
                value.to_string()
            }
        }
    }

    /// Remap a qualified member reference using owner context. Returns `None`
    /// when `value` is not shaped like one.
    pub fn remap_member_reference(&self, value: &str) -> Option<String> {
        let reference = MemberReference::parse(value)?;
        let owner = reference.owner?;

        let name = self.member_name(owner, &reference);
        let mut out = String::with_capacity(value.len());
        if reference.wrapped_owner {
            out.push('L');
            out.push_str(&self.remap_type_name(owner));
            out.push(';');
        } else {
            out.push_str(&self.remap_type_name(owner));
            out.push('.');
        }
        out.push_str(&name);
        match reference.separator {
            Some(':') => {
                out.push(':');
                out.push_str(&self.remap_descriptor(reference.descriptor));
            }
            Some(_) => out.push_str(&self.remap_descriptor(reference.descriptor)),
            None => {}
        }
        Some(out)
    }

    /// Remap every recognisable symbol in `value`; unknown names pass through.
    pub fn remap_string(&self, value: &str) -> String {
        if self.patterns.is_bare_type(value)
            || (value.contains('.') && self.patterns.is_bare_type(&value.replace('.', "/")))
        {
            return self.remap_type_name(value);
        }
        if let Some(remapped) = self.remap_member_reference(value) {
            return remapped;
        }

        let value = self.patterns.method.replace_all(value, |caps: &Captures| {
            self.remap_method_name(&caps[0])
        });
        let value = self.patterns.field.replace_all(&value, |caps: &Captures| {
            self.remap_field_name(&caps[0])
        });
        let value: Cow<'_, str> = self
            .patterns
            .type_descriptor
            .replace_all(&value, |caps: &Captures| {
                format!("L{};", self.remap_type_name(&caps[1]))
            });
        value.into_owned()
    }

    fn member_name(&self, owner: &str, reference: &MemberReference<'_>) -> String {
        // Owner overrides only ever hold methods.
        if reference.separator != Some(':') {
            let internal_owner = owner.replace('.', "/");
            if let Some(target) = self.mappings.overrides.get(&internal_owner, reference.name) {
                return target.to_string();
            }
        }
        let symbols = &self.mappings.symbols;
        let flat = match reference.separator {
            Some(':') => symbols.map_field(reference.name),
            _ if reference.is_method() => symbols.map_method(reference.name),
            _ => symbols
                .map_method(reference.name)
                .or_else(|| symbols.map_field(reference.name)),
        };
        flat.unwrap_or(reference.name).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{OwnerOverrideTable, SymbolTable};
    use test_case::test_case;

    fn mappings() -> MappingSet {
        let mut symbols = SymbolTable::new();
        symbols.insert_type("net/minecraft/class_1", "net/minecraft/world/Level").unwrap();
        symbols.insert_type("net/minecraft/class_2", "net/minecraft/world/Entity").unwrap();
        symbols.insert_method("method_10", "m_10_");
        symbols.insert_method("method_11", "m_11_");
        symbols.insert_field("field_20", "f_20_");
        let mut overrides = OwnerOverrideTable::new();
        overrides.insert("net/minecraft/class_2", "method_10", "m_99_");
        overrides.insert("net/minecraft/class_2", "field_20", "m_77_");
        MappingSet::new(symbols, overrides)
    }

    #[test_case("net/minecraft/class_1", "net/minecraft/world/Level" ; "bare type")]
    #[test_case("net.minecraft.class_1", "net.minecraft.world.Level" ; "dotted type")]
    #[test_case("net/minecraft/class_404", "net/minecraft/class_404" ; "unknown type")]
    #[test_case(
        "Lnet/minecraft/class_1;method_11(Lnet/minecraft/class_2;)V",
        "Lnet/minecraft/world/Level;m_11_(Lnet/minecraft/world/Entity;)V" ;
        "method reference"
    )]
    #[test_case(
        "Lnet/minecraft/class_2;method_10()V",
        "Lnet/minecraft/world/Entity;m_99_()V" ;
        "owner override"
    )]
    #[test_case(
        "Lnet/minecraft/class_1;field_20:I",
        "Lnet/minecraft/world/Level;f_20_:I" ;
        "field reference"
    )]
    #[test_case(
        "Lnet/minecraft/class_2;field_20:I",
        "Lnet/minecraft/world/Entity;f_20_:I" ;
        "field reference skips method overrides"
    )]
    #[test_case("method_10", "m_10_" ; "bare method")]
    #[test_case("at field_20 and method_11", "at f_20_ and m_11_" ; "embedded names")]
    #[test_case("Just some English text", "Just some English text" ; "plain text")]
    #[test_case("method_999", "method_999" ; "unknown method")]
    #[test_case(
        "INVOKE:Lnet/minecraft/class_1;",
        "INVOKE:Lnet/minecraft/world/Level;" ;
        "embedded descriptor"
    )]
    fn remaps_strings(input: &str, expected: &str) {
        let mappings = mappings();
        let remapper = TextRemapper::new(&mappings);
        assert_eq!(remapper.remap_string(input), expected);
    }

    #[test]
    fn member_reference_requires_owner() {
        let mappings = mappings();
        let remapper = TextRemapper::new(&mappings);
        assert_eq!(remapper.remap_member_reference("method_10()V"), None);
        assert_eq!(
            remapper.remap_member_reference("net/minecraft/class_2.method_10()V"),
            Some("net/minecraft/world/Entity.m_99_()V".to_string())
        );
    }

    #[test]
    fn custom_patterns_are_used() {
        let mappings = mappings();
        let patterns = SymbolPatterns::new(r"\bnever\b", r"\bnever\b", r"L(never);", r"^never$")
            .expect("patterns");
        let remapper = TextRemapper::with_patterns(&mappings, patterns);
        assert_eq!(remapper.remap_string("call method_10"), "call method_10");
    }

    #[test]
    fn invalid_descriptor_is_left_alone() {
        let mappings = mappings();
        let remapper = TextRemapper::new(&mappings);
        assert_eq!(remapper.remap_descriptor("Lbroken"), "Lbroken");
    }
}
