//! Supertype and subtype trees for type-hierarchy views.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{LanguageId, Location};
use crate::query::guards::{clamp_depth, MAX_HIERARCHY_DEPTH, MAX_HIERARCHY_NODES};
use crate::store::SymbolStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeHierarchyNode {
    pub name: String,
    pub language: LanguageId,
    /// `None` for names that only appear as a parent and were never indexed.
    pub location: Option<Location>,
    pub children: Vec<TypeHierarchyNode>,
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

struct TreeBuilder<'s> {
    store: &'s SymbolStore,
    language: LanguageId,
    direction: Direction,
    max_depth: usize,
    nodes: usize,
    path: HashSet<String>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, name: &str, depth: usize) -> TypeHierarchyNode {
        self.nodes += 1;
        let mut node = TypeHierarchyNode {
            name: name.to_string(),
            language: self.language,
            location: self.store.class(name, self.language).map(|c| c.location()),
            children: Vec::new(),
        };
        if depth >= self.max_depth {
            return node;
        }

        let next: Vec<String> = match self.direction {
            Direction::Up => self.store.parents(name, self.language).to_vec(),
            Direction::Down => self.store.subtypes(name, self.language),
        };
        self.path.insert(name.to_string());
        for child in next {
            if self.nodes >= MAX_HIERARCHY_NODES {
                break;
            }
            // A name already on the current path closes a cycle.
            if self.path.contains(&child) {
                continue;
            }
            let built = self.build(&child, depth + 1);
            node.children.push(built);
        }
        self.path.remove(name);
        node
    }
}

fn tree(
    store: &SymbolStore,
    name: &str,
    language: LanguageId,
    max_depth: usize,
    direction: Direction,
) -> TypeHierarchyNode {
    let mut builder = TreeBuilder {
        store,
        language,
        direction,
        max_depth: clamp_depth(max_depth, MAX_HIERARCHY_DEPTH),
        nodes: 0,
        path: HashSet::new(),
    };
    builder.build(name, 0)
}

/// Parents of `name`, their parents, and so on, in declared order.
pub fn supertype_tree(
    store: &SymbolStore,
    name: &str,
    language: LanguageId,
    max_depth: usize,
) -> TypeHierarchyNode {
    tree(store, name, language, max_depth, Direction::Up)
}

/// Classes deriving from `name`, transitively, sorted by name per level.
pub fn subtype_tree(
    store: &SymbolStore,
    name: &str,
    language: LanguageId,
    max_depth: usize,
) -> TypeHierarchyNode {
    tree(store, name, language, max_depth, Direction::Down)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassRecord;

    const PY: LanguageId = LanguageId::Python;

    fn store() -> SymbolStore {
        let mut store = SymbolStore::new();
        for (i, name) in ["Animal", "Dog", "Puppy", "Cat"].iter().enumerate() {
            store.insert_class(ClassRecord::new(*name, "/ws/zoo.py", i * 3, 6, PY));
        }
        store.set_parents("Dog", PY, vec!["Animal".into()]);
        store.set_parents("Cat", PY, vec!["Animal".into(), "Pet".into()]);
        store.set_parents("Puppy", PY, vec!["Dog".into()]);
        store
    }

    #[test]
    fn test_supertypes() {
        let store = store();
        let root = supertype_tree(&store, "Puppy", PY, MAX_HIERARCHY_DEPTH);
        assert_eq!(root.name, "Puppy");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "Dog");
        assert_eq!(root.children[0].children[0].name, "Animal");

        let cat = supertype_tree(&store, "Cat", PY, MAX_HIERARCHY_DEPTH);
        let names: Vec<&str> = cat.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Animal", "Pet"]);
        assert!(cat.children[1].location.is_none());
    }

    #[test]
    fn test_subtypes() {
        let store = store();
        let root = subtype_tree(&store, "Animal", PY, MAX_HIERARCHY_DEPTH);
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Cat", "Dog"]);
        assert_eq!(root.children[1].children[0].name, "Puppy");
    }

    #[test]
    fn test_depth_limit() {
        let store = store();
        let root = subtype_tree(&store, "Animal", PY, 1);
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut store = SymbolStore::new();
        store.set_parents("A", PY, vec!["B".into()]);
        store.set_parents("B", PY, vec!["A".into()]);
        let root = supertype_tree(&store, "A", PY, MAX_HIERARCHY_DEPTH);
        assert_eq!(root.children.len(), 1);
        assert!(root.children[0].children.is_empty());
    }
}
