//! Mixin reference-map conversion.
//!
//! A refmap is JSON of the shape
//! `{"mappings": {class: {key: ref}}, "data": {namespace: {class: {key: ref}}}}`.
//! Every string leaf under `mappings` and under each child of `data` is passed
//! through the text remapper. Everything else is copied as-is.

use jarshift_mappings::TextRemapper;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const REFMAP_SUFFIX: &str = "refmap.json";

/// Convert a parsed refmap document. Returns the converted document and the
/// number of references that changed.
pub fn convert_refmap(document: &Value, remapper: &TextRemapper<'_>) -> (Value, usize) {
    let mut changed = 0;
    let Value::Object(root) = document else {
        return (document.clone(), 0);
    };

    let mut out = Map::with_capacity(root.len());
    for (key, value) in root {
        let converted = match (key.as_str(), value) {
            ("mappings", tree) => remap_class_table(tree, remapper, &mut changed),
            ("data", Value::Object(namespaces)) => Value::Object(
                namespaces
                    .iter()
                    .map(|(namespace, tree)| {
                        (
                            namespace.clone(),
                            remap_class_table(tree, remapper, &mut changed),
                        )
                    })
                    .collect(),
            ),
            _ => value.clone(),
        };
        out.insert(key.clone(), converted);
    }
    (Value::Object(out), changed)
}

/// Convert refmap bytes. Returns `None` when the input is not JSON.
pub fn convert_refmap_bytes(
    bytes: &[u8],
    remapper: &TextRemapper<'_>,
) -> Option<(Vec<u8>, usize)> {
    let document: Value = serde_json::from_slice(bytes).ok()?;
    let (converted, changed) = convert_refmap(&document, remapper);
    let mut out = serde_json::to_vec_pretty(&converted).ok()?;
    out.push(b'\n');
    Some((out, changed))
}

/// Refmap paths named by mixin config documents (their `refmap` key).
pub fn refmaps_named_by(config: &Value) -> Option<String> {
    config
        .get("refmap")
        .and_then(Value::as_str)
        .filter(|path| !path.trim().is_empty())
        .map(|path| path.trim_start_matches('/').to_string())
}

/// Whether an archive entry is treated as a refmap.
pub fn is_refmap_entry(name: &str, declared: &BTreeSet<String>) -> bool {
    declared.contains(name) || name.ends_with(REFMAP_SUFFIX)
}

fn remap_class_table(tree: &Value, remapper: &TextRemapper<'_>, changed: &mut usize) -> Value {
    let Value::Object(classes) = tree else {
        return tree.clone();
    };
    Value::Object(
        classes
            .iter()
            .map(|(class, refs)| {
                let refs = match refs {
                    Value::Object(refs) => Value::Object(
                        refs.iter()
                            .map(|(key, value)| (key.clone(), remap_leaf(value, remapper, changed)))
                            .collect(),
                    ),
                    other => other.clone(),
                };
                (class.clone(), refs)
            })
            .collect(),
    )
}

fn remap_leaf(value: &Value, remapper: &TextRemapper<'_>, changed: &mut usize) -> Value {
    match value {
        Value::String(reference) => {
            let remapped = remapper.remap_string(reference);
            if &remapped != reference {
                *changed += 1;
            }
            Value::String(remapped)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarshift_mappings::{MappingSet, OwnerOverrideTable, SymbolTable};
    use serde_json::json;

    fn mappings() -> MappingSet {
        let mut symbols = SymbolTable::new();
        symbols
            .insert_type("net/minecraft/class_310", "net/minecraft/client/Minecraft")
            .unwrap();
        symbols
            .insert_type("net/minecraft/class_1937", "net/minecraft/world/level/Level")
            .unwrap();
        symbols.insert_method("method_1507", "m_91152_");
        symbols.insert_field("field_1724", "f_91074_").unwrap();
        MappingSet::new(symbols, OwnerOverrideTable::new())
    }

    #[test]
    fn remaps_mappings_and_every_data_namespace() {
        let set = mappings();
        let remapper = TextRemapper::new(&set);
        let document = json!({
            "mappings": {
                "com/example/mixin/MinecraftMixin": {
                    "setScreen": "Lnet/minecraft/class_310;method_1507(Lnet/minecraft/class_1937;)V",
                    "player": "field_1724:Lnet/minecraft/class_1937;",
                    "untouched": "Lcom/example/Other;run()V"
                }
            },
            "data": {
                "named:intermediary": {
                    "com/example/mixin/MinecraftMixin": {"setScreen": "method_1507"}
                },
                "searge": {
                    "com/example/mixin/MinecraftMixin": {"count": 3}
                }
            },
            "comment": "method_1507"
        });

        let (converted, changed) = convert_refmap(&document, &remapper);
        let refs = &converted["mappings"]["com/example/mixin/MinecraftMixin"];
        assert_eq!(
            refs["setScreen"],
            "Lnet/minecraft/client/Minecraft;m_91152_(Lnet/minecraft/world/level/Level;)V"
        );
        assert_eq!(refs["player"], "f_91074_:Lnet/minecraft/world/level/Level;");
        assert_eq!(refs["untouched"], "Lcom/example/Other;run()V");
        assert_eq!(
            converted["data"]["named:intermediary"]["com/example/mixin/MinecraftMixin"]["setScreen"],
            "m_91152_"
        );
        assert_eq!(converted["data"]["searge"]["com/example/mixin/MinecraftMixin"]["count"], 3);
        assert_eq!(converted["comment"], "method_1507");
        assert_eq!(changed, 3);
    }

    #[test]
    fn keeps_key_order_and_rejects_non_json() {
        let set = mappings();
        let remapper = TextRemapper::new(&set);
        let input = br#"{"mappings": {"B": {"z": "a", "a": "method_1507"}}, "data": {}}"#;
        let (bytes, changed) = convert_refmap_bytes(input, &remapper).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.find("\"z\"").unwrap() < text.find("\"a\"").unwrap());
        assert!(text.contains("m_91152_"));
        assert_eq!(changed, 1);

        assert!(convert_refmap_bytes(b"not json", &remapper).is_none());
    }

    #[test]
    fn discovers_declared_refmaps() {
        let config = json!({"package": "com.example.mixin", "refmap": "/example-refmap.json"});
        assert_eq!(refmaps_named_by(&config).as_deref(), Some("example-refmap.json"));
        assert_eq!(refmaps_named_by(&json!({"refmap": ""})), None);

        let declared = BTreeSet::from(["custom.json".to_string()]);
        assert!(is_refmap_entry("custom.json", &declared));
        assert!(is_refmap_entry("example.refmap.json", &declared));
        assert!(!is_refmap_entry("example.mixins.json", &declared));
    }
}
