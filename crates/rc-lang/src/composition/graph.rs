//! Composition graph nodes and instance sets.

use crate::decl::{ActionId, GetterId, InitializerId, ReactionId};
use crate::foundation::ReceiverAccess;
use crate::types::TypeId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Handle to a composition instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A concrete occurrence of a component type at a fixed address.
#[derive(Debug)]
pub struct Instance {
    pub parent: Option<InstanceId>,
    pub address: usize,
    /// The named component type.
    pub ty: TypeId,
    /// Top-level instances carry the initializer named in their
    /// declaration; nested instances are initialized by their parent.
    pub initializer: Option<InitializerId>,
    pub offset_in_parent: usize,
    pub name: String,
    pub is_top_level: bool,
    /// Action nodes enumerated for this instance (graph roots).
    pub actions: Vec<NodeId>,
}

/// Three-color DFS state for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mark {
    #[default]
    Unmarked,
    Temporary,
    Marked,
}

/// One node of the composition graph.
#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub state: Mark,
    pub outgoing: Vec<NodeId>,
    pub kind: NodeKind,
    pub(crate) instance_set: Option<InstanceSet>,
}

impl Node {
    pub fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            state: Mark::Unmarked,
            outgoing: Vec::new(),
            kind,
            instance_set: None,
        }
    }
}

/// The role of a graph node.
#[derive(Debug)]
pub enum NodeKind {
    Action {
        instance: InstanceId,
        action: ActionId,
        iota: Option<i64>,
    },
    Reaction {
        instance: InstanceId,
        reaction: ReactionId,
        iota: Option<i64>,
        /// Number of push ports bound to this reaction; at most one is legal.
        incoming_push_ports: usize,
    },
    Getter {
        instance: InstanceId,
        getter: GetterId,
    },
    Activation {
        instance: InstanceId,
        mutable_phase_access: ReceiverAccess,
    },
    PushPort {
        address: usize,
        instance: InstanceId,
    },
    PullPort {
        address: usize,
        instance: InstanceId,
    },
}

/// Map from instance to the strongest access observed along a node.
pub type InstanceSet = BTreeMap<InstanceId, ReceiverAccess>;

/// Record `access` for `instance`, keeping the stronger of old and new.
pub fn insert_access(set: &mut InstanceSet, instance: InstanceId, access: ReceiverAccess) {
    let entry = set.entry(instance).or_insert(ReceiverAccess::None);
    *entry = entry.lub(access);
}

/// Two instance sets are compatible when no shared instance carries a write
/// in both; such a pair could never be scheduled deterministically.
pub fn is_compatible(a: &InstanceSet, b: &InstanceSet) -> bool {
    a.iter().all(|(instance, access)| {
        *access != ReceiverAccess::Write || b.get(instance) != Some(&ReceiverAccess::Write)
    })
}

/// Union `other` into `set`, keeping the strongest access per instance.
pub fn add_union(set: &mut InstanceSet, other: &InstanceSet) {
    for (&instance, &access) in other {
        insert_access(set, instance, access);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(u32, ReceiverAccess)]) -> InstanceSet {
        entries
            .iter()
            .map(|&(i, a)| (InstanceId(i), a))
            .collect()
    }

    #[test]
    fn insert_keeps_strongest_access() {
        let mut s = InstanceSet::new();
        insert_access(&mut s, InstanceId(0), ReceiverAccess::Write);
        insert_access(&mut s, InstanceId(0), ReceiverAccess::Read);
        assert_eq!(s[&InstanceId(0)], ReceiverAccess::Write);
    }

    #[test]
    fn disjoint_sets_are_compatible() {
        let a = set(&[(0, ReceiverAccess::Write)]);
        let b = set(&[(1, ReceiverAccess::Write)]);
        assert!(is_compatible(&a, &b));
    }

    #[test]
    fn two_writers_on_one_instance_are_incompatible() {
        let a = set(&[(0, ReceiverAccess::Write)]);
        let b = set(&[(0, ReceiverAccess::Write), (1, ReceiverAccess::Read)]);
        assert!(!is_compatible(&a, &b));
        assert!(!is_compatible(&b, &a));
    }

    #[test]
    fn reader_and_writer_are_compatible() {
        let a = set(&[(0, ReceiverAccess::Write)]);
        let b = set(&[(0, ReceiverAccess::Read)]);
        assert!(is_compatible(&a, &b));
    }

    #[test]
    fn union_is_monotone() {
        let mut a = set(&[(0, ReceiverAccess::Read)]);
        let b = set(&[(0, ReceiverAccess::Write), (2, ReceiverAccess::Read)]);
        add_union(&mut a, &b);
        assert_eq!(a[&InstanceId(0)], ReceiverAccess::Write);
        assert_eq!(a[&InstanceId(2)], ReceiverAccess::Read);
    }
}
