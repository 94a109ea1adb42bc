//! Access widener to access transformer conversion.
//!
//! Input records are `<verb> <kind> <type> [<member> [<descriptor>]]`, one per
//! line, after an `accessWidener <version> <namespace>` header. Each record
//! becomes one access transformer line. Comments are carried over; records
//! that have no equivalent are dropped with a warning.

use jarshift_mappings::TextRemapper;
use tracing::warn;

pub const ACCESS_TRANSFORMER_PATH: &str = "META-INF/accesstransformer.cfg";

const HEADER_KEYWORD: &str = "accessWidener";
const OUTPUT_HEADER: &str = "# Converted from an access widener by jarshift";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessConversion {
    pub text: String,
    /// Records converted to a transformer line.
    pub converted: usize,
    /// Records dropped because they could not be expressed.
    pub dropped: usize,
}

/// Convert an access widener document.
pub fn convert_access_widener(input: &str, remapper: &TextRemapper<'_>) -> AccessConversion {
    let mut lines = input.lines().peekable();
    if let Some(first) = lines.peek() {
        let mut tokens = first.split_whitespace();
        if tokens.next() == Some(HEADER_KEYWORD) {
            match tokens.next() {
                Some("v1") | Some("v2") => {}
                version => warn!(
                    version = version.unwrap_or(""),
                    "unexpected access widener version, converting anyway"
                ),
            }
            lines.next();
        } else {
            warn!(line = *first, "access widener has no header line");
        }
    }

    let mut conversion = AccessConversion::default();
    let mut out = vec![OUTPUT_HEADER.to_string()];
    for line in lines {
        let (record, comment) = match line.find('#') {
            Some(index) => (&line[..index], &line[index..]),
            None => (line, ""),
        };
        let record = record.trim();
        if record.is_empty() {
            out.push(comment.to_string());
            continue;
        }
        match convert_record(record, remapper) {
            Some(converted) => {
                conversion.converted += 1;
                if comment.is_empty() {
                    out.push(converted);
                } else {
                    out.push(format!("{converted} {comment}"));
                }
            }
            None => {
                warn!(record, "failed to convert access widener line");
                conversion.dropped += 1;
                out.push(comment.to_string());
            }
        }
    }

    conversion.text = out.join("\n");
    conversion.text.push('\n');
    conversion
}

fn convert_record(record: &str, remapper: &TextRemapper<'_>) -> Option<String> {
    let tokens: Vec<&str> = record.split_whitespace().collect();
    let (verb, kind, owner) = match tokens.as_slice() {
        [verb, kind, owner, ..] => (verb.trim_start_matches("transitive-"), *kind, *owner),
        _ => return None,
    };
    let owner = remap_with(remapper.remap_type_name(owner), owner, remapper).replace('/', ".");

    match (kind, verb, &tokens[3..]) {
        ("class", "accessible", []) => Some(format!("public {owner}")),
        ("class", "extendable", []) => Some(format!("public-f {owner}")),
        ("method", verb @ ("accessible" | "extendable"), [name, descriptor]) => {
            let modifier = if verb == "accessible" { "public" } else { "public-f" };
            let name = remap_with(remapper.remap_method_name(name), name, remapper);
            let descriptor = remapper.remap_descriptor(descriptor);
            Some(format!("{modifier} {owner} {name}{descriptor}"))
        }
        ("field", verb @ ("accessible" | "mutable"), [name, _descriptor]) => {
            let modifier = if verb == "accessible" { "public" } else { "public-f" };
            let name = remap_with(remapper.remap_field_name(name), name, remapper);
            Some(format!("{modifier} {owner} {name}"))
        }
        _ => None,
    }
}

/// Prefer an exact table hit; fall back to pattern-based remapping.
fn remap_with(exact: String, original: &str, remapper: &TextRemapper<'_>) -> String {
    if exact != original {
        exact
    } else {
        remapper.remap_string(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarshift_mappings::{MappingSet, OwnerOverrideTable, SymbolTable};
    use test_case::test_case;

    fn mappings() -> MappingSet {
        let mut symbols = SymbolTable::new();
        symbols.insert_type("com/example/Foo", "com/example/Bar").unwrap();
        symbols
            .insert_type("net/minecraft/class_1", "net/minecraft/world/Entity")
            .unwrap();
        symbols.insert_field("fieldName", "renamedField").unwrap();
        symbols.insert_field("field_7", "f_7_").unwrap();
        symbols.insert_method("method_5", "m_5_");
        MappingSet::new(symbols, OwnerOverrideTable::new())
    }

    fn convert_one(record: &str) -> Option<String> {
        let set = mappings();
        let remapper = TextRemapper::new(&set);
        convert_record(record, &remapper)
    }

    #[test_case(
        "accessible field com.example.Foo fieldName Ltype;",
        "public com.example.Bar renamedField" ;
        "dotted field"
    )]
    #[test_case("accessible class net/minecraft/class_1", "public net.minecraft.world.Entity" ; "accessible class")]
    #[test_case("extendable class net/minecraft/class_1", "public-f net.minecraft.world.Entity" ; "extendable class")]
    #[test_case(
        "accessible method net/minecraft/class_1 method_5 (Lnet/minecraft/class_1;)V",
        "public net.minecraft.world.Entity m_5_(Lnet/minecraft/world/Entity;)V" ;
        "accessible method"
    )]
    #[test_case(
        "extendable method net/minecraft/class_1 method_5 ()V",
        "public-f net.minecraft.world.Entity m_5_()V" ;
        "extendable method"
    )]
    #[test_case(
        "mutable field net/minecraft/class_1 field_7 I",
        "public-f net.minecraft.world.Entity f_7_" ;
        "mutable field"
    )]
    #[test_case(
        "transitive-accessible class com/example/Foo",
        "public com.example.Bar" ;
        "transitive verb"
    )]
    fn converts_records(record: &str, expected: &str) {
        assert_eq!(convert_one(record).as_deref(), Some(expected));
    }

    #[test_case("mutable class com/example/Foo" ; "mutable class")]
    #[test_case("extendable field com/example/Foo fieldName I" ; "extendable field")]
    #[test_case("accessible method com/example/Foo run" ; "missing descriptor")]
    #[test_case("accessible" ; "truncated")]
    #[test_case("accessible module com/example/Foo" ; "unknown kind")]
    fn rejects_unconvertible_records(record: &str) {
        assert_eq!(convert_one(record), None);
    }

    #[test]
    fn converts_document_with_comments_and_drops() {
        let set = mappings();
        let remapper = TextRemapper::new(&set);
        let input = "accessWidener v1 intermediary\n\
                     # widen the entity\n\
                     accessible class net/minecraft/class_1 # inline\n\
                     \n\
                     mutable class com/example/Foo # kept comment\n";
        let conversion = convert_access_widener(input, &remapper);
        assert_eq!(
            conversion.text,
            "# Converted from an access widener by jarshift\n\
             # widen the entity\n\
             public net.minecraft.world.Entity # inline\n\
             \n\
             # kept comment\n"
        );
        assert_eq!(conversion.converted, 1);
        assert_eq!(conversion.dropped, 1);
    }

    #[test]
    fn missing_header_treats_first_line_as_record() {
        let set = mappings();
        let remapper = TextRemapper::new(&set);
        let conversion = convert_access_widener("accessible class com/example/Foo", &remapper);
        assert_eq!(
            conversion.text,
            "# Converted from an access widener by jarshift\npublic com.example.Bar\n"
        );
    }
}
