use crate::error::{MappingError, SymbolKind};
use crate::tiny::RawDataset;
use std::collections::HashMap;
use tracing::debug;

/// Flat source-name → target-name tables for types, methods and fields.
///
/// Immutable once built; share it by reference (or `Arc`) across workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    types: HashMap<String, String>,
    methods: HashMap<String, String>,
    fields: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_type(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    pub fn map_method(&self, name: &str) -> Option<&str> {
        self.methods.get(name).map(String::as_str)
    }

    pub fn map_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn types(&self) -> &HashMap<String, String> {
        &self.types
    }

    pub fn methods(&self) -> &HashMap<String, String> {
        &self.methods
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.types.len() + self.methods.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a type mapping. A second, different target for the same source
    /// name is a conflict.
    pub fn insert_type(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), MappingError> {
        insert_unique(&mut self.types, SymbolKind::Type, source.into(), target.into())
    }

    pub fn insert_field(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), MappingError> {
        insert_unique(&mut self.fields, SymbolKind::Field, source.into(), target.into())
    }

    /// Insert a flat method mapping. Method names may legitimately map to
    /// different targets on unrelated owners; the first value is kept here and
    /// owner-specific values live in the [`OwnerOverrideTable`].
    pub fn insert_method(&mut self, source: impl Into<String>, target: impl Into<String>) -> bool {
        let source = source.into();
        let target = target.into();
        match self.methods.get(&source) {
            Some(existing) if *existing != target => {
                debug!(
                    method = %source,
                    kept = %existing,
                    ignored = %target,
                    "flat method mapping differs per owner"
                );
                false
            }
            Some(_) => true,
            None => {
                self.methods.insert(source, target);
                true
            }
        }
    }
}

fn insert_unique(
    map: &mut HashMap<String, String>,
    kind: SymbolKind,
    source: String,
    target: String,
) -> Result<(), MappingError> {
    if let Some(existing) = map.get(&source) {
        if *existing == target {
            return Ok(());
        }
        return Err(MappingError::Conflict {
            kind,
            key: source,
            existing: existing.clone(),
            incoming: target,
        });
    }
    map.insert(source, target);
    Ok(())
}

/// Method renames that only apply to a specific owner type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerOverrideTable {
    owners: HashMap<String, HashMap<String, String>>,
}

impl OwnerOverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &str, name: &str) -> Option<&str> {
        self.owners
            .get(owner)
            .and_then(|members| members.get(name))
            .map(String::as_str)
    }

    pub fn contains_owner(&self, owner: &str) -> bool {
        self.owners.contains_key(owner)
    }

    /// Register `(owner, name) → target`; the first registration wins.
    pub fn insert(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
    ) {
        let members = self.owners.entry(owner.into()).or_default();
        members.entry(name.into()).or_insert_with(|| target.into());
    }

    pub fn len(&self) -> usize {
        self.owners.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the remapping stages need: the flat table plus owner overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSet {
    pub symbols: SymbolTable,
    pub overrides: OwnerOverrideTable,
}

impl MappingSet {
    pub fn new(symbols: SymbolTable, overrides: OwnerOverrideTable) -> Self {
        Self { symbols, overrides }
    }

    /// Build the tables from a joined dataset whose left column is the source
    /// namespace and whose right column is the target namespace.
    pub fn from_dataset(dataset: &RawDataset) -> Result<Self, MappingError> {
        let mut symbols = SymbolTable::new();
        let mut overrides = OwnerOverrideTable::new();

        for ty in &dataset.types {
            symbols.insert_type(&ty.left, &ty.right)?;
            for field in &ty.fields {
                symbols.insert_field(&field.left, &field.right)?;
            }
            for method in &ty.methods {
                symbols.insert_method(&method.left, &method.right);
                overrides.insert(&ty.left, &method.left, &method.right);
                overrides.insert(&ty.right, &method.left, &method.right);
            }
        }

        debug!(
            types = symbols.types.len(),
            methods = symbols.methods.len(),
            fields = symbols.fields.len(),
            overrides = overrides.len(),
            "mapping tables built"
        );

        Ok(Self { symbols, overrides })
    }
}
