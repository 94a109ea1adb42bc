use crate::correspondence::TypeCorrespondence;
use crate::error::MappingError;
use crate::table::MappingSet;
use crate::tiny::{RawDataset, RawMember, RawType};
use std::collections::HashMap;
use tracing::{debug, info};

/// Joins two datasets that share an anchor namespace in their left column.
///
/// The source dataset maps anchor → source names, the target dataset maps
/// anchor → target names. Type names are additionally resolved through the
/// external [`TypeCorrespondence`] when one is supplied.
#[derive(Debug)]
pub struct MappingTableBuilder {
    source: RawDataset,
    target: RawDataset,
    correspondence: TypeCorrespondence,
}

struct TargetType<'a> {
    name: &'a str,
    fields: HashMap<&'a str, &'a str>,
    methods: HashMap<(&'a str, &'a str), &'a str>,
}

impl MappingTableBuilder {
    pub fn new(source: RawDataset, target: RawDataset) -> Self {
        Self {
            source,
            target,
            correspondence: TypeCorrespondence::new(),
        }
    }

    pub fn with_correspondence(mut self, correspondence: TypeCorrespondence) -> Self {
        self.correspondence = correspondence;
        self
    }

    pub fn correspondence(&self) -> &TypeCorrespondence {
        &self.correspondence
    }

    /// Produce the joined dataset (left = source name, right = target name)
    /// in source-dataset order.
    pub fn join(&self) -> RawDataset {
        let index = self.index_target();
        let mut joined = RawDataset {
            namespaces: self.joined_namespaces(),
            types: Vec::with_capacity(self.source.types.len()),
        };
        let mut skipped = 0usize;

        for source_type in &self.source.types {
            let anchor = source_type.left.as_str();
            let counterpart = index.get(anchor);
            let target_name = self
                .correspondence
                .get(anchor)
                .or_else(|| counterpart.map(|ty| ty.name));
            let Some(target_name) = target_name else {
                debug!(anchor, source = %source_type.right, "no target counterpart for type");
                skipped += 1;
                continue;
            };

            let mut ty = RawType::new(&source_type.right, target_name);
            if let Some(counterpart) = counterpart {
                for field in &source_type.fields {
                    match counterpart.fields.get(field.left.as_str()) {
                        Some(target) => ty
                            .fields
                            .push(RawMember::new(&field.descriptor, &field.right, *target)),
                        None => {
                            debug!(owner = anchor, field = %field.left, "no target counterpart for field");
                            skipped += 1;
                        }
                    }
                }
                for method in &source_type.methods {
                    let key = (method.left.as_str(), method.descriptor.as_str());
                    match counterpart.methods.get(&key) {
                        Some(target) => ty
                            .methods
                            .push(RawMember::new(&method.descriptor, &method.right, *target)),
                        None => {
                            debug!(
                                owner = anchor,
                                method = %method.left,
                                descriptor = %method.descriptor,
                                "no target counterpart for method"
                            );
                            skipped += 1;
                        }
                    }
                }
            } else {
                skipped += source_type.fields.len() + source_type.methods.len();
            }
            joined.types.push(ty);
        }

        info!(
            types = joined.types.len(),
            skipped, "joined mapping datasets"
        );
        joined
    }

    /// Join the datasets and build the lookup tables.
    pub fn build(&self) -> Result<MappingSet, MappingError> {
        MappingSet::from_dataset(&self.join())
    }

    fn index_target(&self) -> HashMap<&str, TargetType<'_>> {
        let mut index = HashMap::with_capacity(self.target.types.len());
        for ty in &self.target.types {
            let entry = TargetType {
                name: ty.right.as_str(),
                fields: ty
                    .fields
                    .iter()
                    .map(|field| (field.left.as_str(), field.right.as_str()))
                    .collect(),
                methods: ty
                    .methods
                    .iter()
                    .map(|method| {
                        (
                            (method.left.as_str(), method.descriptor.as_str()),
                            method.right.as_str(),
                        )
                    })
                    .collect(),
            };
            if index.insert(ty.left.as_str(), entry).is_some() {
                debug!(anchor = %ty.left, "anchor type listed twice in target dataset; keeping last");
            }
        }
        index
    }

    fn joined_namespaces(&self) -> Option<(String, String)> {
        match (&self.source.namespaces, &self.target.namespaces) {
            (Some((_, source)), Some((_, target))) => Some((source.clone(), target.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RawDataset {
        RawDataset::parse(
            "tiny\t2\t0\tofficial\tintermediary\n\
             c\ta\tnet/minecraft/class_1\n\
             \tf\tI\tb\tfield_1\n\
             \tm\t()V\tc\tmethod_1\n\
             \tm\t(I)V\tc\tmethod_2\n\
             c\tz\tnet/minecraft/class_9\n",
        )
        .expect("source dataset")
    }

    fn target() -> RawDataset {
        RawDataset::parse(
            "tiny\t2\t0\tofficial\tsrg\n\
             c\ta\tnet/minecraft/world/Thing\n\
             \tf\tI\tb\tf_1_\n\
             \tm\t()V\tc\tm_1_\n",
        )
        .expect("target dataset")
    }

    #[test]
    fn joins_members_on_anchor() {
        let joined = MappingTableBuilder::new(source(), target()).join();
        assert_eq!(
            joined.namespaces,
            Some(("intermediary".to_string(), "srg".to_string()))
        );
        assert_eq!(joined.types.len(), 1);
        let ty = &joined.types[0];
        assert_eq!(ty.left, "net/minecraft/class_1");
        assert_eq!(ty.right, "net/minecraft/world/Thing");
        assert_eq!(ty.fields, vec![RawMember::new("I", "field_1", "f_1_")]);
        // the (I)V overload has no counterpart and is skipped
        assert_eq!(ty.methods, vec![RawMember::new("()V", "method_1", "m_1_")]);
    }

    #[test]
    fn correspondence_takes_precedence_for_type_names() {
        let mut correspondence = TypeCorrespondence::new();
        correspondence.insert("a", "net/minecraft/world/level/Thing");
        correspondence.insert("z", "net/minecraft/Other");
        let set = MappingTableBuilder::new(source(), target())
            .with_correspondence(correspondence)
            .build()
            .expect("build");
        assert_eq!(
            set.symbols.map_type("net/minecraft/class_1"),
            Some("net/minecraft/world/level/Thing")
        );
        // types missing from the target dataset still resolve through the correspondence
        assert_eq!(set.symbols.map_type("net/minecraft/class_9"), Some("net/minecraft/Other"));
        assert_eq!(set.symbols.map_method("method_1"), Some("m_1_"));
    }

    #[test]
    fn conflicting_type_targets_fail() {
        let source = RawDataset::parse("c\ta\tnet/Foo\nc\tb\tnet/Foo\n").unwrap();
        let target = RawDataset::parse("c\ta\tcom/A\nc\tb\tcom/B\n").unwrap();
        let error = MappingTableBuilder::new(source, target)
            .build()
            .expect_err("conflict");
        assert!(matches!(error, MappingError::Conflict { .. }));
    }

    #[test]
    fn methods_are_registered_for_both_owner_names() {
        let set = MappingTableBuilder::new(source(), target()).build().unwrap();
        assert_eq!(set.overrides.get("net/minecraft/class_1", "method_1"), Some("m_1_"));
        assert_eq!(set.overrides.get("net/minecraft/world/Thing", "method_1"), Some("m_1_"));
    }

    #[test]
    fn join_is_deterministic() {
        let builder = MappingTableBuilder::new(source(), target());
        assert_eq!(builder.join().to_text(), builder.join().to_text());
    }
}
