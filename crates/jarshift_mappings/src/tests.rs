use super::*;

fn dataset(text: &str) -> RawDataset {
    RawDataset::parse(text).expect("dataset")
}

#[test]
fn anchor_join_resolves_type_through_target_dataset() {
    let source = dataset("c\ta1\tnet/x/Foo\n");
    let target = dataset("c\ta1\tcom/y/Bar\n");

    let set = MappingTableBuilder::new(source, target)
        .build()
        .expect("build mapping set");

    assert_eq!(set.symbols.types().get("net/x/Foo").map(String::as_str), Some("com/y/Bar"));
}

#[test]
fn mapping_set_reload_matches_fresh_build() {
    let source = dataset(
        "c\ta\tnet/minecraft/class_1\n\tm\t()V\tb\tmethod_1\n\tf\tI\tc\tfield_1\n",
    );
    let target = dataset("c\ta\tnet/minecraft/Thing\n\tm\t()V\tb\tm_1_\n\tf\tI\tc\tf_1_\n");
    let builder = MappingTableBuilder::new(source, target);

    let fresh = builder.build().expect("build");
    let reloaded =
        MappingSet::from_dataset(&RawDataset::parse(&builder.join().to_text()).expect("reparse"))
            .expect("reload");

    assert_eq!(fresh, reloaded);
}

#[test]
fn flat_method_keeps_first_target_when_owners_disagree() {
    let source = dataset(
        "c\ta\tnet/A\n\tm\t()V\tx\tmethod_1\n\
         c\tb\tnet/B\n\tm\t()V\tx\tmethod_1\n",
    );
    let target = dataset(
        "c\ta\tcom/A\n\tm\t()V\tx\tfirst\n\
         c\tb\tcom/B\n\tm\t()V\tx\tsecond\n",
    );

    let set = MappingTableBuilder::new(source, target).build().expect("build");

    assert_eq!(set.symbols.map_method("method_1"), Some("first"));
    assert_eq!(set.overrides.get("net/A", "method_1"), Some("first"));
    assert_eq!(set.overrides.get("net/B", "method_1"), Some("second"));
}

#[test]
fn conflicting_field_targets_are_fatal() {
    let source = dataset("c\ta\tnet/A\n\tf\tI\tx\tfield_1\nc\tb\tnet/B\n\tf\tI\tx\tfield_1\n");
    let target = dataset("c\ta\tcom/A\n\tf\tI\tx\tone\nc\tb\tcom/B\n\tf\tI\tx\ttwo\n");

    let error = MappingTableBuilder::new(source, target)
        .build()
        .expect_err("field conflict");

    assert!(matches!(
        error,
        MappingError::Conflict {
            kind: SymbolKind::Field,
            ..
        }
    ));
}

#[test]
fn access_line_tokens_round_trip_through_text_remapper() {
    let mut symbols = SymbolTable::new();
    symbols.insert_type("com/example/Foo", "com/example/Bar").unwrap();
    symbols.insert_field("fieldName", "renamedField").unwrap();
    let set = MappingSet::new(symbols, OwnerOverrideTable::new());
    let remapper = TextRemapper::new(&set);

    assert_eq!(remapper.remap_type_name("com.example.Foo"), "com.example.Bar");
    assert_eq!(remapper.remap_field_name("fieldName"), "renamedField");
    assert_eq!(remapper.remap_field_name("otherField"), "otherField");
}
