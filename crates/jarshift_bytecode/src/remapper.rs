use crate::hierarchy::TypeGraph;
use crate::signature::{self, SignatureError};
use jarshift_mappings::descriptor::{self, DescriptorError};
use jarshift_mappings::MappingSet;
use tracing::trace;

/// Outcome of a method rename lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameDecision<'a> {
    /// Found in the owner-override table for `owner`, which is either the
    /// queried type or one of its ancestors.
    OwnerOverride { owner: &'a str, target: &'a str },
    /// Found in the flat method table.
    Table(&'a str),
    /// Not mapped; the name is kept.
    PassThrough,
}

impl<'a> RenameDecision<'a> {
    pub fn apply(self, original: &'a str) -> &'a str {
        match self {
            RenameDecision::OwnerOverride { target, .. } | RenameDecision::Table(target) => target,
            RenameDecision::PassThrough => original,
        }
    }
}

/// Resolves source names to target names using the mapping tables and the
/// batch's type graph. Holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct SymbolRemapper<'a> {
    mappings: &'a MappingSet,
    graph: &'a TypeGraph,
}

impl<'a> SymbolRemapper<'a> {
    pub fn new(mappings: &'a MappingSet, graph: &'a TypeGraph) -> Self {
        Self { mappings, graph }
    }

    pub fn mappings(&self) -> &'a MappingSet {
        self.mappings
    }

    pub fn graph(&self) -> &'a TypeGraph {
        self.graph
    }

    pub fn map_type<'s>(&'s self, name: &'s str) -> &'s str {
        self.mappings.symbols.map_type(name).unwrap_or(name)
    }

    /// Field names are looked up flat; owner and descriptor do not matter.
    pub fn map_field<'s>(&'s self, _owner: &str, name: &'s str, _descriptor: &str) -> &'s str {
        match self.mappings.symbols.map_field(name) {
            Some(target) => target,
            None => {
                trace!(field = name, "field passes through");
                name
            }
        }
    }

    pub fn map_method<'s>(&'s self, owner: &'s str, name: &'s str, descriptor: &str) -> &'s str {
        self.decide_method(owner, name, descriptor).apply(name)
    }

    /// Method lookup order: the owner's override, each ancestor's override in
    /// hierarchy order, the flat table, then pass-through.
    pub fn decide_method<'s>(
        &'s self,
        owner: &'s str,
        name: &str,
        _descriptor: &str,
    ) -> RenameDecision<'s> {
        let overrides = &self.mappings.overrides;
        if let Some(target) = overrides.get(owner, name) {
            return RenameDecision::OwnerOverride { owner, target };
        }
        let inherited = self.graph.find_in_hierarchy(owner, |ancestor| {
            overrides
                .get(ancestor, name)
                .map(|target| RenameDecision::OwnerOverride {
                    owner: ancestor,
                    target,
                })
        });
        if let Some(decision) = inherited {
            return decision;
        }
        match self.mappings.symbols.map_method(name) {
            Some(target) => RenameDecision::Table(target),
            None => {
                trace!(owner, method = name, "method passes through");
                RenameDecision::PassThrough
            }
        }
    }

    /// Remap a field or method descriptor.
    pub fn map_descriptor(&self, value: &str) -> Result<String, DescriptorError> {
        descriptor::remap_descriptor(value, |name| self.map_type(name).to_string())
    }

    /// Remap a class (internal name or array descriptor) as found in a
    /// `CONSTANT_Class` entry.
    pub fn map_class_reference(&self, value: &str) -> Result<String, DescriptorError> {
        if value.starts_with('[') {
            self.map_descriptor(value)
        } else {
            Ok(self.map_type(value).to_string())
        }
    }

    /// Remap a generic class, method or field signature.
    pub fn map_signature(&self, value: &str) -> Result<String, SignatureError> {
        signature::remap_signature(value, |name| self.map_type(name).to_string())
    }
}
