//! Shared fixture: a small engineering model with element definitions on the rows,
//! requirements on the columns and one satisfaction rule between them

#![allow(dead_code)]

use relationship_matrix::{
    BinaryRelationship, BinaryRelationshipRule, Category, ClassKind, DomainOfExpertise, InMemorySession, Iteration,
    IterationId, PluginSettings, RebuildRequest, RelationshipMatrix, Session, SourceConfiguration,
    StaticPermissionService, Thing, ThingId, ThingTransaction,
};
use std::sync::Arc;

pub struct Fixture {
    pub session: Arc<InMemorySession>,
    pub permissions: Arc<StaticPermissionService>,
    pub iteration: IterationId,
    pub domain: ThingId,
    pub cat1: ThingId,
    pub cat2: ThingId,
    pub cat3sub1: ThingId,
    pub cat4sub3: ThingId,
    pub cat_rel: ThingId,
    pub rule: Arc<BinaryRelationshipRule>,
    pub ed11: ThingId,
    pub ed12: ThingId,
    pub ed21: ThingId,
    pub ed22: ThingId,
    pub ed31: ThingId,
    pub mass: ThingId,
    pub power: ThingId,
    pub thrust: ThingId,
}

fn element(name: &str, category: &[ThingId], owner: ThingId) -> Thing {
    Thing::new(ClassKind::ElementDefinition, name, name)
        .with_categories(category.iter().copied())
        .with_owner(owner)
}

fn requirement(name: &str, short_name: &str, owner: ThingId) -> Thing {
    Thing::new(ClassKind::Requirement, name, short_name).with_owner(owner)
}

pub fn fixture() -> Fixture {
    fixture_with(|_| {})
}

/// The fixture, with a hook to add things before the session is created
pub fn fixture_with(extend: impl FnOnce(&mut Iteration)) -> Fixture {
    let mut iteration = Iteration::new(IterationId::new());

    let domain = DomainOfExpertise::new("domain", "dom");
    let cat1 = Category::new("cat1", "cat1").with_permissible_classes([ClassKind::ElementDefinition]);
    let cat2 = Category::new("cat2", "cat2").with_permissible_classes([ClassKind::ElementDefinition]);
    let cat3sub1 = Category::new("cat3sub1", "cat3sub1")
        .with_super_categories([cat1.id])
        .with_permissible_classes([ClassKind::ElementDefinition]);
    let cat4sub3 = Category::new("cat4sub3", "cat4sub3")
        .with_super_categories([cat3sub1.id])
        .with_permissible_classes([ClassKind::ElementDefinition]);
    let cat_rel = Category::new("catRel", "catRel").with_permissible_classes([ClassKind::BinaryRelationship]);
    let rule = BinaryRelationshipRule::new(
        "rel",
        cat_rel.id,
        [ClassKind::ElementDefinition],
        [ClassKind::Requirement],
        "satisfies",
    )
    .with_inverse_name("is satisfied by");

    let ed11 = element("ed11", &[cat1.id], domain.id);
    let ed12 = element("ed12", &[cat3sub1.id], domain.id);
    let ed21 = element("ed21", &[cat2.id], domain.id);
    let ed22 = element("ed22", &[cat4sub3.id], domain.id);
    let ed31 = element("ed31", &[cat1.id, cat2.id], domain.id);
    let mass = requirement("Mass", "mss", domain.id);
    let power = requirement("Power", "pwr", domain.id);
    let thrust = requirement("Thrust", "thr", domain.id);

    let fixture_ids = (
        domain.id,
        [cat1.id, cat2.id, cat3sub1.id, cat4sub3.id, cat_rel.id],
        [ed11.id, ed12.id, ed21.id, ed22.id, ed31.id],
        [mass.id, power.id, thrust.id],
    );

    iteration.add_domain(domain);
    iteration.set_active_domain(Some(fixture_ids.0));
    for category in [cat1, cat2, cat3sub1, cat4sub3, cat_rel] {
        iteration.upsert_category(category);
    }
    iteration.upsert_rule(rule.clone());
    for thing in [ed11, ed12, ed21, ed22, ed31, mass, power, thrust] {
        iteration.add_thing(thing).unwrap();
    }
    extend(&mut iteration);

    let permissions = Arc::new(StaticPermissionService::allow_all());
    let session = Arc::new(InMemorySession::new(iteration).with_permissions(permissions.clone()));
    let [cat1, cat2, cat3sub1, cat4sub3, cat_rel] = fixture_ids.1;
    let [ed11, ed12, ed21, ed22, ed31] = fixture_ids.2;
    let [mass, power, thrust] = fixture_ids.3;

    Fixture {
        iteration: session.iteration_id(),
        session,
        permissions,
        domain: fixture_ids.0,
        cat1,
        cat2,
        cat3sub1,
        cat4sub3,
        cat_rel,
        rule: Arc::new(rule),
        ed11,
        ed12,
        ed21,
        ed22,
        ed31,
        mass,
        power,
        thrust,
    }
}

impl Fixture {
    pub fn elements(&self) -> [ThingId; 5] {
        [self.ed11, self.ed12, self.ed21, self.ed22, self.ed31]
    }

    pub fn requirements(&self) -> [ThingId; 3] {
        [self.mass, self.power, self.thrust]
    }

    /// Element definitions on the rows, requirements on the columns, the satisfaction rule
    pub fn request(&self) -> RebuildRequest {
        let settings = PluginSettings::default();
        let library = self.session.categories(self.iteration);

        let mut source_y = SourceConfiguration::new(settings.possible_class_kinds.iter().copied());
        source_y.select_class_kind(Some(ClassKind::ElementDefinition), &library);
        let mut source_x = SourceConfiguration::new(settings.possible_class_kinds.iter().copied());
        source_x.select_class_kind(Some(ClassKind::Requirement), &library);

        RebuildRequest {
            source_y,
            source_x,
            rule: Some(self.rule.clone()),
            show_related_only: false,
            show_deprecated: false,
        }
    }

    /// An orchestrator configured like [`Fixture::request`]
    pub fn matrix(&self) -> RelationshipMatrix {
        let mut matrix = RelationshipMatrix::new(
            self.session.clone(),
            self.permissions.clone(),
            self.iteration,
            &PluginSettings::default(),
        );
        matrix.select_class_kind(relationship_matrix::Axis::Y, Some(ClassKind::ElementDefinition));
        matrix.select_class_kind(relationship_matrix::Axis::X, Some(ClassKind::Requirement));
        let rule = self.rule.clone();
        matrix.select_rule(Some(&rule));
        matrix
    }

    /// Write a relationship of the rule's category through the session
    pub async fn link(&self, source: ThingId, target: ThingId) -> ThingId {
        let relationship = BinaryRelationship::new(source, target, self.cat_rel);
        let id = relationship.id;
        let mut transaction = ThingTransaction::new(self.iteration);
        transaction.create_relationship(relationship);
        self.session.write(transaction).await.unwrap();
        id
    }

    pub async fn unlink(&self, relationship: ThingId) {
        let mut transaction = ThingTransaction::new(self.iteration);
        transaction.delete_relationship(relationship);
        self.session.write(transaction).await.unwrap();
    }
}
