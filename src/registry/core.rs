use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use blake3::Hash;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::content::CellContent;
use crate::error::{PanelError, Result};
use crate::geometry::PanelSize;
use crate::layout::LayoutPattern;
use crate::logging::{LogLevel, TARGET_PANEL, emit, json_kv};
use crate::render::{RenderRequest, SharedDisplay, SlotChange};
use crate::runtime::audit::{PanelAuditEventBuilder, PanelAuditStage};
use crate::runtime::{Actor, ClickEvent, HostEvent, RuntimeConfig};

/// Process-unique panel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PanelId(u64);

impl PanelId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

/// Why a panel stopped being displayed to an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseCause {
    Close,
    Quit,
    Death,
}

impl CloseCause {
    pub const ALL: [CloseCause; 3] = [CloseCause::Close, CloseCause::Quit, CloseCause::Death];

    pub fn as_str(&self) -> &'static str {
        match self {
            CloseCause::Close => "CLOSE",
            CloseCause::Quit => "QUIT",
            CloseCause::Death => "DEATH",
        }
    }
}

pub type ClickHandler = Arc<dyn Fn(&mut ClickEvent) -> Result<()> + Send + Sync>;
pub type CloseHandler = Arc<dyn Fn(&HostEvent, &Actor) -> Result<()> + Send + Sync>;
pub type DefaultCloseHandler = Arc<dyn Fn(&HostEvent) -> Result<()> + Send + Sync>;

pub fn click_handler<F>(handler: F) -> ClickHandler
where
    F: Fn(&mut ClickEvent) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

pub fn close_handler<F>(handler: F) -> CloseHandler
where
    F: Fn(&HostEvent, &Actor) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

pub fn default_close_handler<F>(handler: F) -> DefaultCloseHandler
where
    F: Fn(&HostEvent) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

#[derive(Debug, Clone)]
struct CellState {
    content: CellContent,
    hash: Hash,
}

impl CellState {
    fn new(content: CellContent) -> Self {
        let hash = content.fingerprint();
        Self { content, hash }
    }
}

/// A fixed `rows × 9` grid of cells with click handlers, takeable flags,
/// close handlers and the set of actors currently viewing it.
///
/// Panels are created through [`PanelFactory`](crate::PanelFactory) and shared
/// with their router as a [`SharedPanel`]. Event delivery is assumed to be
/// single threaded; the mutex only makes the sharing sound, it does not order
/// concurrent hosts.
pub struct GridPanel {
    id: PanelId,
    size: PanelSize,
    title: String,
    cells: HashMap<usize, CellState>,
    click_handlers: HashMap<usize, ClickHandler>,
    default_click_handler: Option<ClickHandler>,
    unstealable: BTreeSet<usize>,
    close_handlers: HashMap<CloseCause, CloseHandler>,
    default_close_handler: Option<DefaultCloseHandler>,
    viewers: Vec<Actor>,
    dirty: BTreeSet<usize>,
    display: SharedDisplay,
    config: RuntimeConfig,
}

pub type SharedPanel = Arc<Mutex<GridPanel>>;

/// Lock a shared panel, mapping poisoning into [`PanelError::Poisoned`].
pub fn lock_panel(panel: &SharedPanel) -> Result<MutexGuard<'_, GridPanel>> {
    panel.lock().map_err(|_| PanelError::Poisoned)
}

impl GridPanel {
    pub(crate) fn new(
        size: PanelSize,
        title: impl Into<String>,
        display: SharedDisplay,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            id: PanelId::next(),
            size,
            title: title.into(),
            cells: HashMap::new(),
            click_handlers: HashMap::new(),
            default_click_handler: None,
            unstealable: BTreeSet::new(),
            close_handlers: HashMap::new(),
            default_close_handler: None,
            viewers: Vec::new(),
            dirty: BTreeSet::new(),
            display,
            config,
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> usize {
        self.size.rows()
    }

    pub fn size(&self) -> usize {
        self.size.slots()
    }

    fn check(&self, index: usize) -> Result<usize> {
        if index >= self.size() {
            return Err(PanelError::OutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                size: self.size(),
            });
        }
        Ok(index)
    }

    /// Place `content` at `index`.
    ///
    /// A given `handler` replaces any handler already on the slot. With
    /// `stealable == false` the slot becomes unstealable; `true` leaves its
    /// current flag alone, use [`set_stealable`](Self::set_stealable) to clear it.
    pub fn set_cell(
        &mut self,
        index: usize,
        content: CellContent,
        stealable: bool,
        handler: Option<ClickHandler>,
    ) -> Result<&mut Self> {
        let index = self.check(index)?;
        self.write_content(index, content);
        if let Some(handler) = handler {
            self.click_handlers.insert(index, handler);
        }
        if !stealable {
            self.unstealable.insert(index);
        }
        Ok(self)
    }

    /// Shorthand for an unstealable cell without a handler.
    pub fn set_content(&mut self, index: usize, content: CellContent) -> Result<&mut Self> {
        self.set_cell(index, content, false, None)
    }

    /// Row/column form of [`set_cell`](Self::set_cell); see
    /// [`PanelSize::slot_at`] for the addressing rule.
    pub fn set_cell_at(
        &mut self,
        row: i64,
        column: i64,
        content: CellContent,
        stealable: bool,
        handler: Option<ClickHandler>,
    ) -> Result<&mut Self> {
        let index = self.size.slot_at(row, column)?;
        self.set_cell(index, content, stealable, handler)
    }

    /// Clear content, handler and the unstealable flag at `index`.
    pub fn remove_cell(&mut self, index: usize) -> Result<&mut Self> {
        let index = self.check(index)?;
        if self.cells.remove(&index).is_some() {
            self.dirty.insert(index);
        }
        self.click_handlers.remove(&index);
        self.unstealable.remove(&index);
        Ok(self)
    }

    pub fn remove_cell_at(&mut self, row: i64, column: i64) -> Result<&mut Self> {
        let index = self.size.slot_at(row, column)?;
        self.remove_cell(index)
    }

    pub fn set_stealable(&mut self, index: usize, stealable: bool) -> Result<&mut Self> {
        let index = self.check(index)?;
        if stealable {
            self.unstealable.remove(&index);
        } else {
            self.unstealable.insert(index);
        }
        Ok(self)
    }

    pub fn set_click_handler(&mut self, index: usize, handler: ClickHandler) -> Result<&mut Self> {
        let index = self.check(index)?;
        self.click_handlers.insert(index, handler);
        Ok(self)
    }

    pub fn remove_click_handler(&mut self, index: usize) -> Result<&mut Self> {
        let index = self.check(index)?;
        self.click_handlers.remove(&index);
        Ok(self)
    }

    /// Handler run before the slot handler on every routed click. `None` clears it.
    pub fn set_default_click_handler(&mut self, handler: Option<ClickHandler>) -> &mut Self {
        self.default_click_handler = handler;
        self
    }

    /// Handler run after the per-cause handler on every routed close. `None` clears it.
    pub fn set_default_close_handler(&mut self, handler: Option<DefaultCloseHandler>) -> &mut Self {
        self.default_close_handler = handler;
        self
    }

    pub fn set_close_handler(&mut self, cause: CloseCause, handler: CloseHandler) -> &mut Self {
        self.close_handlers.insert(cause, handler);
        self
    }

    pub fn remove_close_handler(&mut self, cause: CloseCause) -> &mut Self {
        self.close_handlers.remove(&cause);
        self
    }

    /// Fill cells from a pattern. Every placement is an unstealable cell
    /// without a handler.
    ///
    /// Placements are checked before any is written, so a pattern that
    /// reaches a negative slot leaves the panel untouched.
    pub fn apply_layout(&mut self, pattern: &LayoutPattern) -> Result<&mut Self> {
        let size = self.size.slots();
        let placements = pattern
            .placements(size)
            .into_iter()
            .map(|placement| {
                self.size
                    .check(placement.index)
                    .map(|index| (index, placement.content))
            })
            .collect::<Result<Vec<_>>>()?;
        let placed = placements.len();
        for (index, content) in placements {
            self.set_cell(index, content, false, None)?;
        }
        emit(
            self.config.logger.as_ref(),
            LogLevel::Debug,
            TARGET_PANEL,
            "layout_applied",
            [
                json_kv("panel", self.id.get()),
                json_kv("placements", json!(placed)),
            ],
        );
        Ok(self)
    }

    /// Clear every cell, handler and unstealable flag. Viewers stay.
    pub fn reset(&mut self) -> &mut Self {
        let cleared: Vec<usize> = self.cells.keys().copied().collect();
        self.dirty.extend(cleared);
        self.cells.clear();
        self.click_handlers.clear();
        self.default_click_handler = None;
        self.close_handlers.clear();
        self.default_close_handler = None;
        self.unstealable.clear();
        emit(
            self.config.logger.as_ref(),
            LogLevel::Debug,
            TARGET_PANEL,
            "panel_reset",
            [json_kv("panel", self.id.get())],
        );
        self.audit(PanelAuditEventBuilder::new(self.id, PanelAuditStage::PanelReset));
        self
    }

    /// Render the panel to `actor` and add it to the viewers. Showing the
    /// panel again to a current viewer re-renders without duplicating it.
    pub fn show(&mut self, actor: Actor) -> Result<()> {
        let request = self.render_request();
        self.display.open(&actor, &request)?;
        let fresh = !self.is_viewer(&actor);
        if fresh {
            self.viewers.push(actor.clone());
        }
        emit(
            self.config.logger.as_ref(),
            LogLevel::Debug,
            TARGET_PANEL,
            "viewer_shown",
            [
                json_kv("panel", self.id.get()),
                json_kv("actor", actor.id.as_str()),
                json_kv("already_viewing", !fresh),
            ],
        );
        self.audit(
            PanelAuditEventBuilder::new(self.id, PanelAuditStage::ViewerShown)
                .detail("actor", actor.id.as_str()),
        );
        Ok(())
    }

    /// Push slots changed since the last refresh to every viewer.
    /// Returns the number of changed slots.
    ///
    /// Every viewer is tried even when one update fails. The changes stay
    /// pending until a refresh reaches all viewers, and the first display
    /// error is returned.
    pub fn refresh(&mut self) -> Result<usize> {
        if self.dirty.is_empty() {
            return Ok(0);
        }
        let changes: Vec<SlotChange> = self
            .dirty
            .iter()
            .map(|&index| SlotChange {
                index,
                content: self.content(index).cloned(),
            })
            .collect();

        let mut first_error = None;
        for viewer in &self.viewers {
            if let Err(err) = self.display.update(viewer, self.id, &changes) {
                emit(
                    self.config.logger.as_ref(),
                    LogLevel::Warn,
                    TARGET_PANEL,
                    "refresh_failed",
                    [
                        json_kv("panel", self.id.get()),
                        json_kv("actor", viewer.id.as_str()),
                        json_kv("error", err.to_string()),
                    ],
                );
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        self.dirty.clear();
        Ok(changes.len())
    }

    pub fn list_viewers(&self) -> Vec<Actor> {
        self.viewers.clone()
    }

    pub fn is_viewer(&self, actor: &Actor) -> bool {
        self.viewers.iter().any(|viewer| viewer.id == actor.id)
    }

    pub fn content(&self, index: usize) -> Option<&CellContent> {
        self.cells.get(&index).map(|state| &state.content)
    }

    pub fn is_stealable(&self, index: usize) -> bool {
        !self.unstealable.contains(&index)
    }

    pub fn has_click_handler(&self, index: usize) -> bool {
        self.click_handlers.contains_key(&index)
    }

    pub fn has_default_click_handler(&self) -> bool {
        self.default_click_handler.is_some()
    }

    pub fn has_close_handler(&self, cause: CloseCause) -> bool {
        self.close_handlers.contains_key(&cause)
    }

    pub fn has_default_close_handler(&self) -> bool {
        self.default_close_handler.is_some()
    }

    /// Occupied slot indices in ascending order.
    pub fn occupied(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.cells.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            panel: self.id,
            title: self.title.clone(),
            rows: self.rows(),
            size: self.size(),
            cells: (0..self.size())
                .map(|index| self.content(index).cloned())
                .collect(),
        }
    }

    pub(crate) fn click_handler(&self, index: usize) -> Option<ClickHandler> {
        self.click_handlers.get(&index).cloned()
    }

    pub(crate) fn default_click_handler(&self) -> Option<ClickHandler> {
        self.default_click_handler.clone()
    }

    pub(crate) fn close_handler(&self, cause: CloseCause) -> Option<CloseHandler> {
        self.close_handlers.get(&cause).cloned()
    }

    pub(crate) fn default_close_handler(&self) -> Option<DefaultCloseHandler> {
        self.default_close_handler.clone()
    }

    pub(crate) fn remove_viewer(&mut self, actor: &Actor) -> bool {
        let before = self.viewers.len();
        self.viewers.retain(|viewer| viewer.id != actor.id);
        self.viewers.len() != before
    }

    fn write_content(&mut self, index: usize, content: CellContent) {
        let state = CellState::new(content);
        let changed = self
            .cells
            .get(&index)
            .map(|existing| existing.hash != state.hash)
            .unwrap_or(true);
        if changed {
            self.cells.insert(index, state);
            self.dirty.insert(index);
        }
    }

    fn audit(&self, builder: PanelAuditEventBuilder) {
        if let Some(audit) = self.config.audit.as_ref() {
            audit.record(builder.finish());
        }
    }
}

impl fmt::Debug for GridPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridPanel")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("rows", &self.rows())
            .field("occupied", &self.occupied())
            .field("unstealable", &self.unstealable)
            .field("click_handlers", &self.click_handlers.len())
            .field("close_handlers", &self.close_handlers.keys().collect::<Vec<_>>())
            .field("viewers", &self.viewers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::logging::{Logger, MemorySink};
    use crate::render::{PanelDisplay, RecordingDisplay};
    use crate::runtime::audit::BufferedPanelAudit;

    /// Records like `RecordingDisplay` but rejects the first `failures` updates.
    struct FlakyDisplay {
        inner: RecordingDisplay,
        failures: AtomicUsize,
    }

    impl FlakyDisplay {
        fn failing(failures: usize) -> Self {
            Self {
                inner: RecordingDisplay::new(),
                failures: AtomicUsize::new(failures),
            }
        }
    }

    impl PanelDisplay for FlakyDisplay {
        fn open(&self, viewer: &Actor, request: &RenderRequest) -> Result<()> {
            self.inner.open(viewer, request)
        }

        fn update(&self, viewer: &Actor, panel: PanelId, changes: &[SlotChange]) -> Result<()> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(PanelError::Display("viewer went away".to_string()));
            }
            self.inner.update(viewer, panel, changes)
        }
    }

    fn panel(rows: i64) -> (GridPanel, Arc<RecordingDisplay>) {
        let display = Arc::new(RecordingDisplay::new());
        let panel = GridPanel::new(
            PanelSize::new(rows).unwrap(),
            "Test",
            display.clone(),
            RuntimeConfig::default(),
        );
        (panel, display)
    }

    fn stone() -> CellContent {
        CellContent::of("stone")
    }

    #[test]
    fn size_is_rows_times_nine() {
        assert_eq!(panel(1).0.size(), 9);
        assert_eq!(panel(4).0.size(), 36);
    }

    #[test]
    fn set_cell_defaults_to_unstealable() {
        let (mut panel, _) = panel(1);
        panel.set_content(3, stone()).unwrap();
        assert!(!panel.is_stealable(3));

        panel.set_cell(4, stone(), true, None).unwrap();
        assert!(panel.is_stealable(4));
    }

    #[test]
    fn stealable_set_cell_does_not_clear_existing_flag() {
        let (mut panel, _) = panel(1);
        panel.set_cell(2, stone(), false, None).unwrap();
        panel.set_cell(2, stone(), true, None).unwrap();
        assert!(!panel.is_stealable(2));

        panel.set_stealable(2, true).unwrap();
        assert!(panel.is_stealable(2));
        panel.set_stealable(2, false).unwrap();
        panel.set_stealable(2, false).unwrap();
        assert!(!panel.is_stealable(2));
    }

    #[test]
    fn handler_is_replaced_but_not_cleared_by_set_cell() {
        let (mut panel, _) = panel(1);
        panel
            .set_cell(0, stone(), false, Some(click_handler(|_| Ok(()))))
            .unwrap();
        panel.set_cell(0, stone(), false, None).unwrap();
        assert!(panel.has_click_handler(0));

        panel.remove_click_handler(0).unwrap();
        assert!(!panel.has_click_handler(0));
        assert!(panel.content(0).is_some());
    }

    #[test]
    fn out_of_range_indices_fail_without_mutation() {
        let (mut panel, _) = panel(1);
        let err = panel.set_content(9, stone()).unwrap_err();
        assert!(matches!(err, PanelError::OutOfRange { index: 9, size: 9 }));
        assert!(panel.remove_cell(42).is_err());
        assert!(panel.set_stealable(9, true).is_err());
        assert!(panel.set_click_handler(9, click_handler(|_| Ok(()))).is_err());
        assert!(panel.occupied().is_empty());
    }

    #[test]
    fn remove_cell_is_idempotent() {
        let (mut panel, _) = panel(2);
        panel
            .set_cell(5, stone(), false, Some(click_handler(|_| Ok(()))))
            .unwrap();
        panel.remove_cell(5).unwrap();
        panel.remove_cell(5).unwrap();
        assert!(panel.content(5).is_none());
        assert!(!panel.has_click_handler(5));
        assert!(panel.is_stealable(5));
    }

    #[test]
    fn row_column_overload_uses_product_address() {
        let (mut panel, _) = panel(3);
        panel.set_cell_at(2, 3, stone(), false, None).unwrap();
        assert!(panel.content(5).is_some());
        panel.remove_cell_at(3, 2).unwrap();
        assert!(panel.content(5).is_none());

        let err = panel.set_cell_at(0, 5, stone(), false, None).unwrap_err();
        assert!(matches!(err, PanelError::OutOfRange { index: -1, .. }));
    }

    #[test]
    fn chained_mutation_returns_same_panel() {
        let (mut panel, _) = panel(1);
        panel
            .set_content(0, stone())
            .unwrap()
            .set_cell(1, stone(), true, None)
            .unwrap()
            .set_close_handler(CloseCause::Quit, close_handler(|_, _| Ok(())))
            .set_default_click_handler(Some(click_handler(|_| Ok(()))));
        assert_eq!(panel.occupied(), vec![0, 1]);
        assert!(panel.has_close_handler(CloseCause::Quit));
        assert!(panel.has_default_click_handler());
    }

    #[test]
    fn reset_clears_registry_but_keeps_viewers() {
        let (mut panel, _) = panel(1);
        panel
            .set_cell(0, stone(), false, Some(click_handler(|_| Ok(()))))
            .unwrap();
        panel
            .set_close_handler(CloseCause::Close, close_handler(|_, _| Ok(())))
            .set_default_close_handler(Some(default_close_handler(|_| Ok(()))));
        panel.show(Actor::player("alex")).unwrap();

        panel.reset();

        assert!(panel.occupied().is_empty());
        assert!(!panel.has_click_handler(0));
        assert!(panel.is_stealable(0));
        assert!(!panel.has_close_handler(CloseCause::Close));
        assert!(!panel.has_default_close_handler());
        assert_eq!(panel.list_viewers(), vec![Actor::player("alex")]);
    }

    #[test]
    fn show_renders_full_grid_and_deduplicates_viewers() {
        let (mut panel, display) = panel(2);
        panel.set_content(10, stone()).unwrap();
        panel.show(Actor::player("alex")).unwrap();
        panel.show(Actor::player("steve")).unwrap();
        panel.show(Actor::player("alex")).unwrap();

        assert_eq!(
            panel.list_viewers(),
            vec![Actor::player("alex"), Actor::player("steve")]
        );
        let opened = display.opened_for("alex");
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].size, 18);
        assert_eq!(opened[0].title, "Test");
        assert_eq!(opened[0].cells[10], Some(stone()));
        assert!(opened[0].cells[0].is_none());
    }

    #[test]
    fn refresh_pushes_only_changed_slots() {
        let (mut panel, display) = panel(1);
        panel.set_content(1, stone()).unwrap();
        panel.show(Actor::player("alex")).unwrap();
        assert_eq!(panel.refresh().unwrap(), 1);
        assert_eq!(panel.refresh().unwrap(), 0);

        panel.set_content(1, stone()).unwrap();
        assert!(!panel.has_pending_changes());

        panel.set_content(1, CellContent::of("dirt")).unwrap();
        panel.remove_cell(1).unwrap();
        panel.set_content(2, stone()).unwrap();
        assert_eq!(panel.refresh().unwrap(), 2);

        let updates = display.updates_for("alex");
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1][0], SlotChange { index: 1, content: None });
        assert_eq!(updates[1][1].content, Some(stone()));
    }

    #[test]
    fn show_and_reset_are_audited() {
        let audit = Arc::new(BufferedPanelAudit::new());
        let config = RuntimeConfig {
            audit: Some(audit.clone()),
            ..RuntimeConfig::default()
        };
        let mut panel = GridPanel::new(
            PanelSize::new(1).unwrap(),
            "",
            Arc::new(RecordingDisplay::new()),
            config,
        );
        panel.show(Actor::player("alex")).unwrap();
        panel.reset();
        assert_eq!(
            audit.stages(),
            vec![PanelAuditStage::ViewerShown, PanelAuditStage::PanelReset]
        );
    }

    #[test]
    fn remove_viewer_reports_membership() {
        let (mut panel, _) = panel(1);
        panel.show(Actor::player("alex")).unwrap();
        assert!(panel.remove_viewer(&Actor::player("alex")));
        assert!(!panel.remove_viewer(&Actor::player("alex")));
        assert!(panel.list_viewers().is_empty());
    }

    #[test]
    fn failed_refresh_keeps_changes_pending_and_reaches_other_viewers() {
        let display = Arc::new(FlakyDisplay::failing(1));
        let sink = Arc::new(MemorySink::new());
        let config = RuntimeConfig {
            logger: Some(Logger::from_shared(sink.clone())),
            ..RuntimeConfig::default()
        };
        let mut panel = GridPanel::new(PanelSize::new(1).unwrap(), "", display.clone(), config);
        panel.show(Actor::player("alex")).unwrap();
        panel.show(Actor::player("steve")).unwrap();
        panel.set_content(0, stone()).unwrap();

        let err = panel.refresh().unwrap_err();
        assert!(matches!(err, PanelError::Display(_)));
        assert!(panel.has_pending_changes());
        assert!(display.inner.updates_for("alex").is_empty());
        assert_eq!(display.inner.updates_for("steve").len(), 1);
        assert!(sink.messages().contains(&"refresh_failed".to_string()));

        assert_eq!(panel.refresh().unwrap(), 1);
        assert!(!panel.has_pending_changes());
        let delivered = display.inner.updates_for("alex");
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0][0], SlotChange { index: 0, content: Some(stone()) });
    }

    #[test]
    fn layout_cells_are_unstealable_without_handlers() {
        let (mut panel, _) = panel(3);
        let border = LayoutPattern::of_lines(["#########", "#       #", "#########"])
            .with_content('#', stone());
        panel.apply_layout(&border).unwrap();

        let occupied = panel.occupied();
        assert_eq!(occupied.first(), Some(&0));
        assert_eq!(occupied.last(), Some(&24));
        for index in occupied {
            assert!(!panel.is_stealable(index));
            assert!(!panel.has_click_handler(index));
        }
        assert!(panel.content(25).is_none());
    }

    #[test]
    fn layout_on_single_row_overwrites_last_slot_and_stops() {
        let (mut panel, _) = panel(1);
        let pattern = LayoutPattern::of_lines(["xxxxxxxxx", "yyyyyyyyy", "zzzzzzzzz"])
            .with_content('x', stone())
            .with_content('y', CellContent::of("y"))
            .with_content('z', CellContent::of("z"));
        panel.apply_layout(&pattern).unwrap();

        assert_eq!(panel.occupied(), (0..9).collect::<Vec<_>>());
        assert_eq!(panel.content(0), Some(&stone()));
        assert_eq!(panel.content(8).map(|c| c.material.as_str()), Some("y"));
        assert!(!panel.is_stealable(0));
    }

    #[test]
    fn layout_reaching_negative_slot_leaves_panel_untouched() {
        let (mut panel, _) = panel(2);
        panel.set_cell(4, stone(), true, None).unwrap();
        panel.refresh().unwrap();
        let pattern = LayoutPattern::of_lines(["xxxxxxxxx", "xxxxxxxxx"])
            .with_content('x', CellContent::of("glass"))
            .start_at_line(0);

        let err = panel.apply_layout(&pattern).unwrap_err();
        assert!(matches!(err, PanelError::OutOfRange { index: -9, size: 18 }));
        assert_eq!(panel.occupied(), vec![4]);
        assert_eq!(panel.content(4), Some(&stone()));
        assert!(panel.is_stealable(4));
        assert!(!panel.has_pending_changes());
    }
}
