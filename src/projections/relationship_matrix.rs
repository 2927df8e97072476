//! The relationship matrix orchestrator
//!
//! Ties the two axis configurations, the rule configuration and the matrix projection to the
//! session's change events. All grid updates happen on the thread that owns the
//! [`RelationshipMatrix`]; a rebuild may be computed on a blocking worker, but its result is
//! installed by [`RelationshipMatrix::complete_background_rebuild`] on the owning thread.

use super::grid::{MatrixGrid, RebuildRequest, RefreshSummary};
use super::matrix::{MatrixProjection, Selection};
use super::relationship_configuration::RelationshipConfiguration;
use super::source_configuration::{memberships, SourceConfiguration};
use crate::aggregate::{BinaryRelationshipRule, Thing};
use crate::commands::MatrixCommand;
use crate::events::{ChangeScope, ChangedThing, ObjectChangedEvent, Subscription};
use crate::handlers::{PermissionService, Session};
use crate::queries::MatrixExport;
use crate::settings::{PluginSettings, SavedConfiguration};
use crate::value_objects::{Axis, ClassKind, IterationId, ThingId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// What handling a change event did to the matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored,
    Refreshed(RefreshSummary),
    Rebuilt,
    /// A rebuild was requested while another was in flight
    Coalesced,
}

/// A rebuild running on a blocking worker
pub struct PendingRebuild {
    generation: u64,
    handle: JoinHandle<MatrixGrid>,
}

impl PendingRebuild {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The relationship matrix tool of one iteration
pub struct RelationshipMatrix {
    session: Arc<dyn Session>,
    permissions: Arc<dyn PermissionService>,
    iteration: IterationId,
    show_deprecated: bool,
    source_y: SourceConfiguration,
    source_x: SourceConfiguration,
    relationship: RelationshipConfiguration,
    matrix: MatrixProjection,
    show_directionality: bool,
    show_related_only: bool,
    highlight_unrelated: bool,
    subscription: Subscription,
    busy: bool,
    rebuild_requested: bool,
    generation: u64,
    feedback: Option<String>,
}

impl RelationshipMatrix {
    pub fn new(
        session: Arc<dyn Session>,
        permissions: Arc<dyn PermissionService>,
        iteration: IterationId,
        settings: &PluginSettings,
    ) -> Self {
        let library = session.categories(iteration);
        let domains = session.active_domains(iteration);

        let mut source_y = SourceConfiguration::new(settings.possible_class_kinds.iter().copied());
        source_y.populate_possible_categories(&library);
        source_y.populate_possible_owners(domains);
        let source_x = source_y.clone();

        let subscription = session.message_bus().listen(ChangeScope::All);
        let matrix = MatrixProjection::new(Arc::clone(&session), Arc::clone(&permissions), iteration);

        Self {
            session,
            permissions,
            iteration,
            show_deprecated: settings.show_deprecated,
            source_y,
            source_x,
            relationship: RelationshipConfiguration::new(),
            matrix,
            show_directionality: true,
            show_related_only: false,
            highlight_unrelated: false,
            subscription,
            busy: false,
            rebuild_requested: false,
            generation: 0,
            feedback: None,
        }
    }

    pub fn matrix(&self) -> &MatrixProjection {
        &self.matrix
    }

    pub fn grid(&self) -> &MatrixGrid {
        self.matrix.grid()
    }

    pub fn source(&self, axis: Axis) -> &SourceConfiguration {
        match axis {
            Axis::Y => &self.source_y,
            Axis::X => &self.source_x,
        }
    }

    fn source_mut(&mut self, axis: Axis) -> &mut SourceConfiguration {
        match axis {
            Axis::Y => &mut self.source_y,
            Axis::X => &mut self.source_x,
        }
    }

    pub fn relationship_configuration(&self) -> &RelationshipConfiguration {
        &self.relationship
    }

    pub fn selected_rule(&self) -> Option<&Arc<BinaryRelationshipRule>> {
        self.relationship.selected_rule()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Message of the last failed write, if any
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn clear_feedback(&mut self) {
        self.feedback = None;
    }

    // Configuration

    /// Change the class kind of an axis; the applicable rules are recomputed before rebuilding
    pub fn select_class_kind(&mut self, axis: Axis, kind: Option<ClassKind>) -> EventOutcome {
        let library = self.session.categories(self.iteration);
        self.source_mut(axis).select_class_kind(kind, &library);
        self.update_rules();
        self.request_rebuild()
    }

    /// Change the filter, display or sort settings of an axis
    pub fn configure(&mut self, axis: Axis, change: impl FnOnce(&mut SourceConfiguration)) -> EventOutcome {
        let kind = self.source(axis).selected_class_kind;
        change(self.source_mut(axis));
        if self.source(axis).selected_class_kind != kind {
            self.update_rules();
        }
        self.request_rebuild()
    }

    pub fn select_rule(&mut self, rule: Option<&Arc<BinaryRelationshipRule>>) -> EventOutcome {
        if self.relationship.select_rule(rule) {
            self.request_rebuild()
        } else {
            EventOutcome::Ignored
        }
    }

    /// Directionality only changes how exported cells read; the grid keeps every direction
    pub fn set_show_directionality(&mut self, show: bool) {
        self.show_directionality = show;
    }

    pub fn show_directionality(&self) -> bool {
        self.show_directionality
    }

    pub fn set_show_related_only(&mut self, show: bool) -> EventOutcome {
        self.show_related_only = show;
        self.request_rebuild()
    }

    pub fn show_related_only(&self) -> bool {
        self.show_related_only
    }

    /// Highlighting is display only; the grid already carries the relationship counts
    pub fn set_highlight_unrelated(&mut self, highlight: bool) {
        self.highlight_unrelated = highlight;
    }

    pub fn highlight_unrelated(&self) -> bool {
        self.highlight_unrelated
    }

    /// Exchange rows and columns
    pub fn swap_axes(&mut self) -> EventOutcome {
        std::mem::swap(&mut self.source_y, &mut self.source_x);
        self.update_rules();
        self.request_rebuild()
    }

    fn update_rules(&mut self) {
        let rules = self.session.rules(self.iteration);
        self.relationship.populate_applicable_rules(
            rules,
            self.source_y.selected_class_kind,
            self.source_x.selected_class_kind,
        );
    }

    fn rebuild_request(&self) -> RebuildRequest {
        RebuildRequest {
            source_y: self.source_y.clone(),
            source_x: self.source_x.clone(),
            rule: self.relationship.selected_rule().cloned(),
            show_related_only: self.show_related_only,
            show_deprecated: self.show_deprecated,
        }
    }

    // Rebuilding

    /// Rebuild now, unless a background rebuild is in flight.
    ///
    /// While one is in flight the request is coalesced into a single follow-up rebuild and
    /// the pending result is marked stale.
    pub fn request_rebuild(&mut self) -> EventOutcome {
        if self.busy {
            self.rebuild_requested = true;
            self.generation += 1;
            debug!(generation = self.generation, "Rebuild coalesced");
            return EventOutcome::Coalesced;
        }

        self.busy = true;
        self.generation += 1;
        let request = self.rebuild_request();
        self.matrix.rebuild(&request);
        self.busy = false;
        EventOutcome::Rebuilt
    }

    /// Start a rebuild on a blocking worker; `None` when one is already in flight
    pub fn begin_background_rebuild(&mut self) -> Option<PendingRebuild> {
        if self.busy {
            self.rebuild_requested = true;
            self.generation += 1;
            return None;
        }

        self.busy = true;
        self.generation += 1;
        let request = self.rebuild_request();
        let session = Arc::clone(&self.session);
        let iteration = self.iteration;
        let handle =
            tokio::task::spawn_blocking(move || MatrixGrid::build(session.as_ref(), iteration, &request));

        Some(PendingRebuild {
            generation: self.generation,
            handle,
        })
    }

    /// Install the result of a background rebuild, unless it was superseded.
    ///
    /// Returns whether the result was installed. A coalesced follow-up rebuild runs afterwards.
    pub async fn complete_background_rebuild(&mut self, pending: PendingRebuild) -> bool {
        let result = pending.handle.await;
        self.busy = false;

        let installed = match result {
            Ok(grid) if pending.generation == self.generation => {
                self.matrix.install(grid);
                true
            }
            Ok(_) => {
                debug!(
                    generation = pending.generation,
                    current = self.generation,
                    "Discarding superseded rebuild"
                );
                false
            }
            Err(join_error) => {
                error!(error = %join_error, "Background rebuild failed");
                false
            }
        };

        if std::mem::take(&mut self.rebuild_requested) {
            self.request_rebuild();
        }
        installed
    }

    // Change events

    /// Handle every change event published since the last call, in order
    pub fn drain_events(&mut self) -> Vec<EventOutcome> {
        let events = self.subscription.drain();
        events.iter().map(|event| self.handle_event(event)).collect()
    }

    pub fn handle_event(&mut self, event: &ObjectChangedEvent) -> EventOutcome {
        if event.iteration != self.iteration {
            return EventOutcome::Ignored;
        }

        match &event.changed {
            ChangedThing::Relationship(relationship) => {
                let Some(rule) = self.relationship.selected_rule() else {
                    return EventOutcome::Ignored;
                };
                let displayed = self.grid().relationships().any(|r| r.id == relationship.id);
                if !displayed && !relationship.is_in_category(&rule.relationship_category) {
                    return EventOutcome::Ignored;
                }

                // with related-only on, relationship edits change which rows and columns are shown
                if self.show_related_only || self.busy {
                    self.request_rebuild()
                } else {
                    EventOutcome::Refreshed(self.matrix.refresh())
                }
            }
            ChangedThing::Thing(thing) => {
                if self.thing_requires_rebuild(thing) {
                    self.request_rebuild()
                } else {
                    EventOutcome::Ignored
                }
            }
            ChangedThing::Category(_) => {
                let library = self.session.categories(self.iteration);
                self.source_y.populate_possible_categories(&library);
                self.source_x.populate_possible_categories(&library);
                self.request_rebuild()
            }
            ChangedThing::Rule(_) => {
                let previous = self.relationship.selected_rule().cloned();
                self.update_rules();
                if previous.is_none() && self.relationship.selected_rule().is_none() {
                    return EventOutcome::Ignored;
                }
                self.request_rebuild()
            }
        }
    }

    /// Whether a thing entering, changing or leaving the model affects the rows or columns
    fn thing_requires_rebuild(&self, thing: &Thing) -> bool {
        let (Some(kind_y), Some(kind_x)) = (self.source_y.selected_class_kind, self.source_x.selected_class_kind)
        else {
            return false;
        };
        if self.relationship.selected_rule().is_none() {
            return false;
        }
        if thing.class_kind != kind_y && thing.class_kind != kind_x {
            return false;
        }
        if self.grid().contains_thing(&thing.id) {
            return true;
        }

        let library = self.session.categories(self.iteration);
        let definition_of = |id: &ThingId| self.session.thing(self.iteration, id);
        let categories = memberships(thing, &definition_of);

        [&self.source_y, &self.source_x]
            .into_iter()
            .filter(|source| source.selected_class_kind == Some(thing.class_kind))
            .any(|source| {
                !source.has_category_filter()
                    || !source.category_filter(&library).all_categories().is_disjoint(&categories)
            })
    }

    // Selection and commands

    pub fn select_cell(&mut self, row: ThingId, column: ThingId) {
        self.matrix.select_cell(row, column);
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.matrix.select(selection);
    }

    /// Carry out a relationship command on the selected cell.
    ///
    /// Failures are logged and kept as [`feedback`](Self::feedback); the grid keeps its last
    /// state. On success the resulting change events are handled before returning.
    pub async fn execute(&mut self, command: MatrixCommand) -> bool {
        match self.matrix.execute(command).await {
            Ok(()) => {
                self.feedback = None;
                self.drain_events();
                true
            }
            Err(err) => {
                error!(%command, error = %err, "Relationship change failed");
                self.feedback = Some(err.to_string());
                false
            }
        }
    }

    /// Create the row to column relationship, or delete it when present
    pub async fn toggle_row_to_column(&mut self) -> Option<MatrixCommand> {
        let command = self.matrix.toggle_row_to_column_command()?;
        self.execute(command).await.then_some(command)
    }

    /// Create the column to row relationship, or delete it when present
    pub async fn toggle_column_to_row(&mut self) -> Option<MatrixCommand> {
        let command = self.matrix.toggle_column_to_row_command()?;
        self.execute(command).await.then_some(command)
    }

    /// Delete whatever the selected cell holds
    pub async fn delete_any(&mut self) -> Option<MatrixCommand> {
        let command = self.matrix.delete_any_command()?;
        self.execute(command).await.then_some(command)
    }

    fn selected_thing(&self, axis: Axis) -> Option<&Arc<Thing>> {
        let cell = self.matrix.selected_cell()?;
        match axis {
            Axis::Y => Some(&cell.row_thing),
            Axis::X => cell.column_thing.as_ref(),
        }
    }

    /// Whether the selected thing of an axis may be edited
    pub fn can_edit(&self, axis: Axis) -> bool {
        self.selected_thing(axis)
            .map_or(false, |thing| self.permissions.can_write(thing))
    }

    /// Whether the selected thing of an axis may be inspected
    pub fn can_inspect(&self, axis: Axis) -> bool {
        self.selected_thing(axis)
            .map_or(false, |thing| self.permissions.can_read(thing))
    }

    // Saved configurations

    pub fn save_configuration(&self, name: impl Into<String>, description: impl Into<String>) -> SavedConfiguration {
        SavedConfiguration {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            source_y: self.source_y.to_record(),
            source_x: self.source_x.to_record(),
            relationship_rule: self
                .relationship
                .to_reference(self.source_y.selected_class_kind, self.source_x.selected_class_kind),
            show_directionality: self.show_directionality,
            show_related_only: self.show_related_only,
            highlight_unrelated: self.highlight_unrelated,
        }
    }

    /// Restore a saved configuration and rebuild
    pub fn load_configuration(&mut self, configuration: &SavedConfiguration) -> EventOutcome {
        let library = self.session.categories(self.iteration);
        let domains = self.session.active_domains(self.iteration);

        self.source_y
            .apply_record(&configuration.source_y, &library, domains.clone());
        self.source_x.apply_record(&configuration.source_x, &library, domains);
        self.update_rules();

        match &configuration.relationship_rule {
            Some(reference) => {
                if !self.relationship.select_reference(reference) && self.relationship.selected_rule().is_none() {
                    warn!(configuration = %configuration.name, "Saved relationship rule is no longer applicable");
                }
            }
            None => {
                self.relationship.select_rule(None);
            }
        }

        self.show_directionality = configuration.show_directionality;
        self.show_related_only = configuration.show_related_only;
        self.highlight_unrelated = configuration.highlight_unrelated;
        self.request_rebuild()
    }

    /// Snapshot of the grid for exporters
    pub fn export(&self) -> MatrixExport {
        MatrixExport::from_grid(self.grid(), self.show_directionality)
    }
}
