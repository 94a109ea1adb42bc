//! Class hierarchy index over every archive of a batch.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Types that
//! are referenced as a parent or interface but never defined in the batch
//! become synthetic leaf nodes.

use crate::classfile::{read_header, ClassHeader, ClassParseError};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("IO error while indexing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error while indexing {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("class parse error in {path}: {source}")]
    ClassFile {
        path: PathBuf,
        #[source]
        source: ClassParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    name: String,
    archive: Option<PathBuf>,
    defined: bool,
    parent: Option<NodeId>,
    interfaces: Vec<NodeId>,
}

impl TypeNode {
    fn synthetic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            archive: None,
            defined: false,
            parent: None,
            interfaces: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archive that defined this type, if it was read from one.
    pub fn archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    /// True for types only ever seen as a parent or interface reference.
    pub fn is_synthetic(&self) -> bool {
        !self.defined
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn interfaces(&self) -> &[NodeId] {
        &self.interfaces
    }
}

/// Type name → node graph. Read-only once the batch has been indexed.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    by_name: HashMap<String, NodeId>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    pub fn id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.id(name).map(|id| self.node(id))
    }

    /// Record one class header. Returns `false` when the type was already
    /// defined; the first definition is kept.
    pub fn insert(&mut self, header: &ClassHeader, archive: Option<&Path>) -> bool {
        let id = self.ensure_node(&header.name);
        if self.nodes[id.0].defined {
            debug!(
                class = %header.name,
                kept = ?self.nodes[id.0].archive,
                skipped = ?archive,
                "duplicate type definition; keeping first"
            );
            return false;
        }

        let parent = header
            .super_name
            .as_deref()
            .map(|name| self.ensure_node(name));
        let interfaces = header
            .interfaces
            .iter()
            .map(|name| self.ensure_node(name))
            .collect();

        let node = &mut self.nodes[id.0];
        node.defined = true;
        node.archive = archive.map(Path::to_path_buf);
        node.parent = parent;
        node.interfaces = interfaces;
        true
    }

    /// Read every class header in the archive and add it to the graph.
    ///
    /// The archive is read completely before anything is inserted, so an
    /// archive that fails to index leaves the graph untouched.
    pub fn index_archive(&mut self, path: &Path) -> Result<usize, HierarchyError> {
        let headers = read_archive_headers(path)?;
        let mut inserted = 0;
        for header in &headers {
            if self.insert(header, Some(path)) {
                inserted += 1;
            }
        }
        debug!(
            archive = %path.display(),
            classes = headers.len(),
            inserted,
            "indexed archive"
        );
        Ok(inserted)
    }

    /// True if `name` is `ancestor` or transitively extends or implements it.
    pub fn does_extend(&self, name: &str, ancestor: &str) -> bool {
        if name == ancestor {
            return true;
        }
        let Some(start) = self.id(name) else {
            return false;
        };

        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.node(id);
            if node.name == ancestor {
                return true;
            }
            stack.extend(node.interfaces.iter().rev().copied());
            stack.extend(node.parent);
        }
        false
    }

    /// Depth-first pre-order walk starting at `name`: the type itself, then
    /// its parent chain, then each interface. Not deduplicated; a node already
    /// on the current path is not re-entered.
    pub fn hierarchy<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let Some(start) = self.id(name) else {
            return vec![name];
        };
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.walk(start, &mut path, &mut out);
        out
    }

    /// First `Some` produced by `visit` along the order of [`Self::hierarchy`].
    ///
    /// A node whose subtree was already searched without a hit is skipped,
    /// so shared ancestors (interface diamonds) are visited once.
    pub fn find_in_hierarchy<'a, T>(
        &'a self,
        name: &'a str,
        mut visit: impl FnMut(&'a str) -> Option<T>,
    ) -> Option<T> {
        let Some(start) = self.id(name) else {
            return visit(name);
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.node(id);
            if let Some(found) = visit(&node.name) {
                return Some(found);
            }
            stack.extend(node.interfaces.iter().rev().copied());
            stack.extend(node.parent);
        }
        None
    }

    fn walk<'a>(&'a self, id: NodeId, path: &mut Vec<NodeId>, out: &mut Vec<&'a str>) {
        if path.contains(&id) {
            trace!(class = %self.node(id).name, "cycle in type hierarchy");
            return;
        }
        let node = self.node(id);
        out.push(&node.name);
        path.push(id);
        if let Some(parent) = node.parent {
            self.walk(parent, path, out);
        }
        for interface in &node.interfaces {
            self.walk(*interface, path, out);
        }
        path.pop();
    }

    fn ensure_node(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(TypeNode::synthetic(name));
        self.by_name.insert(name.to_string(), id);
        id
    }
}

fn read_archive_headers(path: &Path) -> Result<Vec<ClassHeader>, HierarchyError> {
    let file = File::open(path).map_err(|source| HierarchyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|source| HierarchyError::Zip {
            path: path.to_path_buf(),
            source,
        })?;

    let mut headers = Vec::new();
    let mut buffer = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).map_err(|source| HierarchyError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_string();
        if !is_class_entry(&name) {
            continue;
        }

        buffer.clear();
        entry
            .read_to_end(&mut buffer)
            .map_err(|source| HierarchyError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let header = read_header(&buffer).map_err(|source| HierarchyError::ClassFile {
            path: archive_entry_path(path, &name),
            source,
        })?;
        headers.push(header);
    }
    Ok(headers)
}

/// Class entries that define a type (module and package descriptors do not).
pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class")
        && !name.ends_with("module-info.class")
        && !name.ends_with("package-info.class")
        && !name.starts_with("META-INF/versions/")
}

fn archive_entry_path(archive: &Path, entry: &str) -> PathBuf {
    let mut display = archive.display().to_string();
    display.push('!');
    display.push('/');
    display.push_str(entry);
    PathBuf::from(display)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, parent: Option<&str>, interfaces: &[&str]) -> ClassHeader {
        ClassHeader {
            access_flags: 0,
            name: name.to_string(),
            super_name: parent.map(str::to_string),
            interfaces: interfaces.iter().map(|name| name.to_string()).collect(),
        }
    }

    fn graph() -> TypeGraph {
        let mut graph = TypeGraph::new();
        graph.insert(&header("a/Base", Some("java/lang/Object"), &["a/Marker"]), None);
        graph.insert(&header("a/Left", Some("a/Base"), &[]), None);
        graph.insert(&header("a/Right", Some("a/Base"), &["a/Extra"]), None);
        graph.insert(&header("a/Marker", Some("java/lang/Object"), &[]), None);
        graph
    }

    #[test]
    fn does_extend_is_reflexive_even_for_unknown_types() {
        let graph = graph();
        assert!(graph.does_extend("a/Left", "a/Left"));
        assert!(graph.does_extend("x/Unknown", "x/Unknown"));
    }

    #[test]
    fn does_extend_follows_parents_and_interfaces() {
        let graph = graph();
        assert!(graph.does_extend("a/Left", "a/Base"));
        assert!(graph.does_extend("a/Left", "java/lang/Object"));
        assert!(graph.does_extend("a/Left", "a/Marker"));
        assert!(graph.does_extend("a/Right", "a/Extra"));
    }

    #[test]
    fn siblings_do_not_extend_each_other() {
        let graph = graph();
        assert!(!graph.does_extend("a/Left", "a/Right"));
        assert!(!graph.does_extend("a/Right", "a/Left"));
    }

    #[test]
    fn hierarchy_is_pre_order_and_not_deduplicated() {
        let graph = graph();
        assert_eq!(
            graph.hierarchy("a/Right"),
            vec![
                "a/Right",
                "a/Base",
                "java/lang/Object",
                "a/Marker",
                "java/lang/Object",
                "a/Extra",
            ]
        );
    }

    #[test]
    fn unknown_parents_become_synthetic_leaves() {
        let graph = graph();
        let object = graph.get("java/lang/Object").expect("synthetic node");
        assert!(object.is_synthetic());
        assert_eq!(object.parent(), None);
        assert!(!graph.get("a/Base").unwrap().is_synthetic());
    }

    #[test]
    fn first_definition_wins() {
        let mut graph = graph();
        let first = Path::new("first.jar");
        let mut fresh = TypeGraph::new();
        assert!(fresh.insert(&header("b/Dup", Some("b/One"), &[]), Some(first)));
        assert!(!fresh.insert(&header("b/Dup", Some("b/Two"), &[]), Some(Path::new("second.jar"))));
        let node = fresh.get("b/Dup").unwrap();
        assert_eq!(node.archive(), Some(first));
        assert_eq!(fresh.node(node.parent().unwrap()).name(), "b/One");

        // a synthetic node is upgraded when its definition arrives later
        assert!(graph.insert(&header("a/Extra", None, &[]), None));
        assert!(!graph.get("a/Extra").unwrap().is_synthetic());
    }

    #[test]
    fn search_follows_hierarchy_order() {
        let graph = graph();
        let mut seen = Vec::new();
        let hit = graph.find_in_hierarchy("a/Right", |name| {
            seen.push(name);
            (name == "a/Extra").then_some(name)
        });
        assert_eq!(hit, Some("a/Extra"));
        assert_eq!(
            seen,
            vec!["a/Right", "a/Base", "java/lang/Object", "a/Marker", "a/Extra"]
        );
        assert_eq!(graph.find_in_hierarchy("x/Unknown", |name| Some(name)), Some("x/Unknown"));
    }

    #[test]
    fn search_visits_shared_ancestors_once() {
        // 40 stacked interface diamonds: a walk that re-enters shared
        // ancestors would take 2^40 steps.
        let mut graph = TypeGraph::new();
        for level in 0..40 {
            let top = format!("d/Top{level}");
            let bottom = format!("d/Top{}", level + 1);
            let left = format!("d/Left{level}");
            let right = format!("d/Right{level}");
            graph.insert(&header(&top, None, &[left.as_str(), right.as_str()]), None);
            graph.insert(&header(&left, None, &[bottom.as_str()]), None);
            graph.insert(&header(&right, None, &[bottom.as_str()]), None);
        }
        let mut visits = 0;
        let hit = graph.find_in_hierarchy("d/Top0", |name| {
            visits += 1;
            (name == "d/Missing").then_some(())
        });
        assert_eq!(hit, None);
        assert_eq!(visits, 121);
    }

    #[test]
    fn cycles_terminate() {
        let mut graph = TypeGraph::new();
        graph.insert(&header("c/A", Some("c/B"), &[]), None);
        graph.insert(&header("c/B", Some("c/A"), &[]), None);
        assert_eq!(graph.hierarchy("c/A"), vec!["c/A", "c/B"]);
        assert_eq!(graph.find_in_hierarchy("c/A", |name| (name == "c/Z").then_some(())), None);
        assert!(!graph.does_extend("c/A", "c/Missing"));
        assert!(graph.does_extend("c/A", "c/B"));
    }
}
