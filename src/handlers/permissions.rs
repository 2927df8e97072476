//! Table-driven permission service

use super::PermissionService;
use crate::aggregate::Thing;
use crate::value_objects::{ClassKind, IterationId, ThingId};
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Denials {
    write_kinds: HashSet<ClassKind>,
    write_things: HashSet<ThingId>,
    read_things: HashSet<ThingId>,
}

/// Permission service granting everything except explicitly denied kinds and things.
///
/// Denials can be changed at runtime; callers re-evaluate permissions on every selection
/// change and pick up the new answers.
#[derive(Debug, Default)]
pub struct StaticPermissionService {
    denials: RwLock<Denials>,
}

impl StaticPermissionService {
    /// A service allowing every read and write
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn deny_write_kind(&self, kind: ClassKind) {
        self.denials.write().write_kinds.insert(kind);
    }

    pub fn allow_write_kind(&self, kind: ClassKind) {
        self.denials.write().write_kinds.remove(&kind);
    }

    pub fn deny_write(&self, id: ThingId) {
        self.denials.write().write_things.insert(id);
    }

    pub fn deny_read(&self, id: ThingId) {
        self.denials.write().read_things.insert(id);
    }
}

impl PermissionService for StaticPermissionService {
    fn can_write_kind(&self, kind: ClassKind, _iteration: IterationId) -> bool {
        !self.denials.read().write_kinds.contains(&kind)
    }

    fn can_write(&self, thing: &Thing) -> bool {
        let denials = self.denials.read();
        !denials.write_kinds.contains(&thing.class_kind) && !denials.write_things.contains(&thing.id)
    }

    fn can_read(&self, thing: &Thing) -> bool {
        !self.denials.read().read_things.contains(&thing.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denials() {
        let permissions = StaticPermissionService::allow_all();
        let requirement = Thing::new(ClassKind::Requirement, "R1", "r1");
        let iteration = IterationId::new();

        assert!(permissions.can_write_kind(ClassKind::BinaryRelationship, iteration));
        assert!(permissions.can_write(&requirement));

        permissions.deny_write_kind(ClassKind::BinaryRelationship);
        permissions.deny_write(requirement.id);
        assert!(!permissions.can_write_kind(ClassKind::BinaryRelationship, iteration));
        assert!(!permissions.can_write(&requirement));
        assert!(permissions.can_read(&requirement));

        permissions.allow_write_kind(ClassKind::BinaryRelationship);
        assert!(permissions.can_write_kind(ClassKind::BinaryRelationship, iteration));
    }
}
