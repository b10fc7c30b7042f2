//! Canvas placement controller.
//!
//! # Responsibility
//! - Own the placed elements and the in-memory element catalog.
//! - Detect overlaps on every move and start combinations.
//! - Apply finished combinations: replace both inputs with the result, or
//!   restore them on failure.
//!
//! # Invariants
//! - Every placement carries an explicit `PlacementState`; only `Idle`
//!   placements can be moved or picked as overlap partners, so no placement
//!   takes part in two combinations at once.
//! - Overlap partners are picked in insertion order.
//! - The controller never waits on the resolver; results arrive through a
//!   channel and are applied by `next_resolution` / `apply_ready_resolutions`.
//! - Every started combination reports back exactly once, even when its
//!   resolution task panics.

use crate::catalog::{starter_elements, CatalogError, CatalogStore};
use crate::generator::ElementGenerator;
use crate::geometry::{drop_origin, overlaps, Point};
use crate::model::element::{Element, PlacedElement, PlacementId};
use crate::repo::pair_repo::PairRepository;
use crate::service::resolver::{CombinationResolver, Resolution, ResolveError};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of one outstanding combination.
pub type CombinationId = Uuid;

/// Part a placement plays in an outstanding combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRole {
    /// The dragged element; hidden until the combination finishes.
    Moving,
    /// The element landed on; shown with a loading indicator.
    Anchor,
}

/// Lifecycle tag of one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    Idle,
    PendingResolution {
        combination: CombinationId,
        role: PlacementRole,
    },
}

impl PlacementState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Errors from placement operations.
#[derive(Debug)]
pub enum PlacementError {
    /// No placement with this id is on the canvas.
    NotFound(PlacementId),
    /// Placement is part of an outstanding combination.
    Busy(PlacementId),
    /// Catalog store failed.
    Catalog(CatalogError),
    /// Controller was created outside a tokio runtime.
    NoRuntime,
}

impl Display for PlacementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "placement not found: {id}"),
            Self::Busy(id) => write!(f, "placement is awaiting a combination: {id}"),
            Self::Catalog(err) => write!(f, "{err}"),
            Self::NoRuntime => write!(f, "placement controller requires a tokio runtime"),
        }
    }
}

impl Error for PlacementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Catalog(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CatalogError> for PlacementError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

/// Result of one position update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No overlap; the new position was committed.
    Moved,
    /// The moved element landed on `anchor`; a combination is in flight.
    Combining {
        combination: CombinationId,
        moving: PlacementId,
        anchor: PlacementId,
    },
}

/// A finished combination as applied to the canvas.
#[derive(Debug)]
pub enum CombinationEvent {
    Combined {
        combination: CombinationId,
        /// Both consumed placements: `[moving, anchor]`.
        consumed: [PlacementId; 2],
        placed: PlacedElement,
        resolution: Resolution,
        /// Whether the element was new to the catalog.
        newly_cataloged: bool,
    },
    Failed {
        combination: CombinationId,
        /// Both restored placements: `[moving, anchor]`.
        restored: [PlacementId; 2],
        error: ResolveError,
    },
}

#[derive(Debug)]
struct Placement {
    element: PlacedElement,
    state: PlacementState,
}

#[derive(Debug, Clone, Copy)]
struct PendingCombination {
    moving: PlacementId,
    anchor: PlacementId,
    anchor_origin: Point,
}

struct CompletedResolution {
    combination: CombinationId,
    result: Result<Resolution, ResolveError>,
}

/// Owns the canvas and drives overlap-triggered combinations.
pub struct PlacementController<R, G, C>
where
    R: PairRepository + 'static,
    G: ElementGenerator + 'static,
    C: CatalogStore,
{
    resolver: Arc<CombinationResolver<R, G>>,
    runtime: Handle,
    catalog_store: C,
    catalog: Vec<Element>,
    placements: HashMap<PlacementId, Placement>,
    order: Vec<PlacementId>,
    pending: HashMap<CombinationId, PendingCombination>,
    in_flight: usize,
    completed_tx: mpsc::UnboundedSender<CompletedResolution>,
    completed_rx: mpsc::UnboundedReceiver<CompletedResolution>,
}

impl<R, G, C> PlacementController<R, G, C>
where
    R: PairRepository + 'static,
    G: ElementGenerator + 'static,
    C: CatalogStore,
{
    /// Creates a controller and reads the catalog once.
    ///
    /// An empty catalog is seeded with the starter elements and persisted.
    /// Must be called from within a tokio runtime; resolutions are spawned
    /// on that runtime.
    pub fn new(
        resolver: Arc<CombinationResolver<R, G>>,
        mut catalog_store: C,
    ) -> Result<Self, PlacementError> {
        let runtime = Handle::try_current().map_err(|_| PlacementError::NoRuntime)?;
        let mut catalog = catalog_store.load()?;
        if catalog.is_empty() {
            catalog = starter_elements();
            catalog_store.replace(&catalog)?;
        }
        info!(
            "event=canvas_init module=placement status=ok catalog_size={}",
            catalog.len()
        );

        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Ok(Self {
            resolver,
            runtime,
            catalog_store,
            catalog,
            placements: HashMap::new(),
            order: Vec::new(),
            pending: HashMap::new(),
            in_flight: 0,
            completed_tx,
            completed_rx,
        })
    }

    pub fn resolver(&self) -> &Arc<CombinationResolver<R, G>> {
        &self.resolver
    }

    /// Discovered elements in discovery order.
    pub fn catalog(&self) -> &[Element] {
        &self.catalog
    }

    /// Visible placements in insertion order; anchors of outstanding
    /// combinations are included with `is_loading = true`.
    pub fn placed_elements(&self) -> Vec<PlacedElement> {
        self.order
            .iter()
            .filter_map(|id| self.placements.get(id))
            .filter(|placement| {
                !matches!(
                    placement.state,
                    PlacementState::PendingResolution {
                        role: PlacementRole::Moving,
                        ..
                    }
                )
            })
            .map(|placement| placement.element.clone())
            .collect()
    }

    pub fn state_of(&self, id: PlacementId) -> Option<PlacementState> {
        self.placements.get(&id).map(|placement| placement.state)
    }

    /// Number of combinations still shown as loading.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Places `element` centred on the cursor position.
    pub fn drop_element(
        &mut self,
        element: &Element,
        cursor_x: f64,
        cursor_y: f64,
    ) -> PlacedElement {
        let origin = drop_origin(element, cursor_x, cursor_y);
        let placed = PlacedElement::new(element, origin.x, origin.y);
        debug!(
            "event=element_drop module=placement status=ok placement={} x={} y={}",
            placed.id, placed.x, placed.y
        );
        self.insert_placement(placed.clone());
        placed
    }

    /// Moves one placement and starts a combination on overlap.
    ///
    /// # Errors
    /// - `NotFound` when `id` is not on the canvas.
    /// - `Busy` when `id` is part of an outstanding combination.
    pub fn move_element(
        &mut self,
        id: PlacementId,
        x: f64,
        y: f64,
    ) -> Result<MoveOutcome, PlacementError> {
        let placement = self.placements.get(&id).ok_or(PlacementError::NotFound(id))?;
        if !placement.state.is_idle() {
            return Err(PlacementError::Busy(id));
        }

        let mut candidate = placement.element.clone();
        candidate.x = x;
        candidate.y = y;

        let partner = self
            .order
            .iter()
            .filter(|other| **other != id)
            .filter_map(|other| self.placements.get(other))
            .find(|other| other.state.is_idle() && overlaps(&candidate, &other.element))
            .map(|other| other.element.id);

        match partner {
            None => {
                if let Some(placement) = self.placements.get_mut(&id) {
                    placement.element.x = x;
                    placement.element.y = y;
                }
                Ok(MoveOutcome::Moved)
            }
            Some(anchor) => Ok(self.begin_combination(id, anchor)),
        }
    }

    /// Waits for the next finished combination and applies it.
    ///
    /// Returns `None` once nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<CombinationEvent> {
        while self.in_flight > 0 {
            let completed = self.completed_rx.recv().await?;
            self.in_flight -= 1;
            if let Some(event) = self.apply_completed(completed) {
                return Some(event);
            }
        }
        None
    }

    /// Applies every already finished combination without waiting.
    pub fn apply_ready_resolutions(&mut self) -> Vec<CombinationEvent> {
        let mut events = Vec::new();
        while let Ok(completed) = self.completed_rx.try_recv() {
            self.in_flight -= 1;
            events.extend(self.apply_completed(completed));
        }
        events
    }

    /// Removes every placement, including those awaiting a combination.
    ///
    /// Combinations still in flight finish in the background; their results
    /// extend the catalog but place nothing.
    pub fn clear_canvas(&mut self) {
        info!(
            "event=canvas_clear module=placement status=ok removed={} abandoned={}",
            self.placements.len(),
            self.pending.len()
        );
        self.placements.clear();
        self.order.clear();
        self.pending.clear();
    }

    /// Clears the canvas and resets the catalog to the starter elements.
    pub fn reset_catalog(&mut self) -> Result<(), PlacementError> {
        self.clear_canvas();
        let starters = starter_elements();
        self.catalog_store.replace(&starters)?;
        self.catalog = starters;
        info!("event=catalog_reset module=placement status=ok");
        Ok(())
    }

    fn insert_placement(&mut self, element: PlacedElement) {
        self.order.push(element.id);
        self.placements.insert(
            element.id,
            Placement {
                element,
                state: PlacementState::Idle,
            },
        );
    }

    fn remove_placement(&mut self, id: PlacementId) {
        self.placements.remove(&id);
        self.order.retain(|current| *current != id);
    }

    fn begin_combination(&mut self, moving: PlacementId, anchor: PlacementId) -> MoveOutcome {
        let combination = Uuid::new_v4();
        let label_of = |id: PlacementId| {
            self.placements
                .get(&id)
                .map(|placement| placement.element.text.clone())
                .unwrap_or_default()
        };
        let (label1, label2) = (label_of(moving), label_of(anchor));

        let mut anchor_origin = Point::new(0.0, 0.0);
        for (id, role) in [(moving, PlacementRole::Moving), (anchor, PlacementRole::Anchor)] {
            if let Some(placement) = self.placements.get_mut(&id) {
                placement.state = PlacementState::PendingResolution { combination, role };
                if role == PlacementRole::Anchor {
                    placement.element.is_loading = true;
                    anchor_origin = Point::new(placement.element.x, placement.element.y);
                }
            }
        }

        self.pending.insert(
            combination,
            PendingCombination {
                moving,
                anchor,
                anchor_origin,
            },
        );
        self.in_flight += 1;

        info!(
            "event=combination_start module=placement status=ok combination={} moving={} anchor={}",
            combination, moving, anchor
        );

        let resolver = Arc::clone(&self.resolver);
        let completed_tx = self.completed_tx.clone();
        let resolution = self
            .runtime
            .spawn(async move { resolver.resolve(&label1, &label2).await });
        self.runtime.spawn(async move {
            // A panicking generator surfaces here as a JoinError.
            let result = resolution.await.unwrap_or_else(|err| Err(err.into()));
            // The controller may already be gone; its result is then moot.
            let _ = completed_tx.send(CompletedResolution {
                combination,
                result,
            });
        });

        MoveOutcome::Combining {
            combination,
            moving,
            anchor,
        }
    }

    fn apply_completed(&mut self, completed: CompletedResolution) -> Option<CombinationEvent> {
        let CompletedResolution {
            combination,
            result,
        } = completed;

        let Some(pending) = self.pending.remove(&combination) else {
            debug!(
                "event=combination_finish module=placement status=abandoned combination={}",
                combination
            );
            if let Ok(resolution) = &result {
                self.record_discovery(&resolution.element);
            }
            return None;
        };

        match result {
            Ok(resolution) => {
                self.remove_placement(pending.moving);
                self.remove_placement(pending.anchor);

                let placed = PlacedElement::new(
                    &resolution.element,
                    pending.anchor_origin.x,
                    pending.anchor_origin.y,
                );
                self.insert_placement(placed.clone());
                let newly_cataloged = self.record_discovery(&resolution.element);

                info!(
                    "event=combination_finish module=placement status=ok combination={} placement={} newly_cataloged={}",
                    combination, placed.id, newly_cataloged
                );
                Some(CombinationEvent::Combined {
                    combination,
                    consumed: [pending.moving, pending.anchor],
                    placed,
                    resolution,
                    newly_cataloged,
                })
            }
            Err(error) => {
                for id in [pending.moving, pending.anchor] {
                    if let Some(placement) = self.placements.get_mut(&id) {
                        placement.state = PlacementState::Idle;
                        placement.element.is_loading = false;
                    }
                }
                warn!(
                    "event=combination_finish module=placement status=error combination={} error_code={}",
                    combination,
                    error.code()
                );
                Some(CombinationEvent::Failed {
                    combination,
                    restored: [pending.moving, pending.anchor],
                    error,
                })
            }
        }
    }

    /// Appends `element` to the catalog unless its identity is known.
    ///
    /// Store failures are logged; the in-memory catalog still records it.
    fn record_discovery(&mut self, element: &Element) -> bool {
        if self
            .catalog
            .iter()
            .any(|known| known.same_identity(element))
        {
            return false;
        }
        let entry = Element::new(element.emoji.clone(), element.text.clone());
        if let Err(err) = self.catalog_store.append(&entry) {
            warn!(
                "event=catalog_append module=placement status=error element={} error={}",
                entry.identity(),
                err
            );
        }
        self.catalog.push(entry);
        true
    }
}
