use std::io::Write;
use std::sync::{Arc, Mutex};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::Print;
use serde::Serialize;

use crate::content::CellContent;
use crate::error::{PanelError, Result};
use crate::geometry::COLUMNS;
use crate::registry::PanelId;
use crate::runtime::Actor;
use crate::width::fit_to_width;

/// Full snapshot of a panel handed to the display when it is opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub panel: PanelId,
    pub title: String,
    pub rows: usize,
    pub size: usize,
    pub cells: Vec<Option<CellContent>>,
}

/// One slot whose content changed since the last refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotChange {
    pub index: usize,
    pub content: Option<CellContent>,
}

/// Display surface that actually shows panels to actors.
pub trait PanelDisplay: Send + Sync {
    fn open(&self, viewer: &Actor, request: &RenderRequest) -> Result<()>;

    fn update(&self, viewer: &Actor, panel: PanelId, changes: &[SlotChange]) -> Result<()>;
}

pub type SharedDisplay = Arc<dyn PanelDisplay>;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayRecord {
    Opened {
        viewer: Actor,
        request: RenderRequest,
    },
    Updated {
        viewer: Actor,
        panel: PanelId,
        changes: Vec<SlotChange>,
    },
}

/// Headless display that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    records: Mutex<Vec<DisplayRecord>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DisplayRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Render requests sent to `viewer`, oldest first.
    pub fn opened_for(&self, viewer: &str) -> Vec<RenderRequest> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                DisplayRecord::Opened { viewer: v, request } if v.id == viewer => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn updates_for(&self, viewer: &str) -> Vec<Vec<SlotChange>> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                DisplayRecord::Updated {
                    viewer: v, changes, ..
                } if v.id == viewer => Some(changes),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: DisplayRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| PanelError::Display("recording display poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}

impl PanelDisplay for RecordingDisplay {
    fn open(&self, viewer: &Actor, request: &RenderRequest) -> Result<()> {
        self.push(DisplayRecord::Opened {
            viewer: viewer.clone(),
            request: request.clone(),
        })
    }

    fn update(&self, viewer: &Actor, panel: PanelId, changes: &[SlotChange]) -> Result<()> {
        self.push(DisplayRecord::Updated {
            viewer: viewer.clone(),
            panel,
            changes: changes.to_vec(),
        })
    }
}

/// Settings for the terminal display.
#[derive(Debug, Clone)]
pub struct AnsiDisplaySettings {
    /// Top-left corner of the panel frame, 0-based.
    pub origin: (u16, u16),
    /// Columns reserved per cell label.
    pub cell_width: u16,
    /// Label drawn for an empty slot.
    pub empty_label: String,
}

impl Default for AnsiDisplaySettings {
    fn default() -> Self {
        Self {
            origin: (0, 0),
            cell_width: 8,
            empty_label: "·".to_string(),
        }
    }
}

/// Draws panels as a labelled 9-column grid on a terminal-like writer.
///
/// The title takes the first line; each row of slots follows, with labels
/// separated by a single space. All viewers share the one writer.
pub struct AnsiDisplay<W: Write + Send> {
    writer: Mutex<W>,
    settings: AnsiDisplaySettings,
}

impl<W: Write + Send> AnsiDisplay<W> {
    pub fn new(writer: W) -> Self {
        Self::with_settings(writer, AnsiDisplaySettings::default())
    }

    pub fn with_settings(writer: W, settings: AnsiDisplaySettings) -> Self {
        Self {
            writer: Mutex::new(writer),
            settings,
        }
    }

    pub fn settings(&self) -> &AnsiDisplaySettings {
        &self.settings
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|_| PanelError::Poisoned)
    }

    fn cell_position(&self, index: usize) -> (u16, u16) {
        let (x, y) = self.settings.origin;
        let row = (index / COLUMNS) as u16;
        let col = (index % COLUMNS) as u16;
        (x + col * (self.settings.cell_width + 1), y + 1 + row)
    }

    fn label(&self, content: Option<&CellContent>) -> String {
        let text = match content {
            Some(content) if !content.is_empty() => {
                if content.amount > 1 {
                    format!("{}x{}", content.label(), content.amount)
                } else {
                    content.label().to_string()
                }
            }
            _ => self.settings.empty_label.clone(),
        };
        fit_to_width(&text, self.settings.cell_width as usize)
    }

    fn draw_cell(&self, writer: &mut W, index: usize, content: Option<&CellContent>) -> Result<()> {
        let (col, row) = self.cell_position(index);
        queue!(writer, MoveTo(col, row), Print(self.label(content)))?;
        Ok(())
    }
}

impl<W: Write + Send> PanelDisplay for AnsiDisplay<W> {
    fn open(&self, _viewer: &Actor, request: &RenderRequest) -> Result<()> {
        let mut guard = self.writer.lock().map_err(|_| PanelError::Poisoned)?;
        let writer = &mut *guard;
        let (x, y) = self.settings.origin;
        let frame_width = COLUMNS * (self.settings.cell_width as usize + 1) - 1;
        queue!(writer, MoveTo(x, y), Print(fit_to_width(&request.title, frame_width)))?;
        for (index, content) in request.cells.iter().enumerate() {
            self.draw_cell(writer, index, content.as_ref())?;
        }
        writer.flush()?;
        Ok(())
    }

    fn update(&self, _viewer: &Actor, _panel: PanelId, changes: &[SlotChange]) -> Result<()> {
        let mut guard = self.writer.lock().map_err(|_| PanelError::Poisoned)?;
        let writer = &mut *guard;
        for change in changes {
            self.draw_cell(writer, change.index, change.content.as_ref())?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RenderRequest {
        let mut cells = vec![None; 9];
        cells[0] = Some(CellContent::of("stone").amount(3));
        cells[4] = Some(CellContent::of("clock").name("Timer"));
        RenderRequest {
            panel: PanelId::from_raw(1),
            title: "Shop".to_string(),
            rows: 1,
            size: 9,
            cells,
        }
    }

    #[test]
    fn recording_display_keeps_requests_per_viewer() {
        let display = RecordingDisplay::new();
        display.open(&Actor::player("alex"), &request()).unwrap();
        display
            .update(
                &Actor::player("steve"),
                PanelId::from_raw(1),
                &[SlotChange {
                    index: 2,
                    content: None,
                }],
            )
            .unwrap();

        assert_eq!(display.opened_for("alex").len(), 1);
        assert!(display.opened_for("steve").is_empty());
        assert_eq!(display.updates_for("steve")[0][0].index, 2);
    }

    #[test]
    fn ansi_display_positions_labels_in_grid() {
        let display = AnsiDisplay::new(Vec::new());
        display.open(&Actor::player("alex"), &request()).unwrap();
        let rendered = String::from_utf8(display.into_inner().unwrap()).unwrap();

        assert!(rendered.contains("\u{1b}[1;1HShop"));
        assert!(rendered.contains("\u{1b}[2;1Hstonex3 "));
        // slot 4 starts at column 4 * 9 = 36 (0-based)
        assert!(rendered.contains("\u{1b}[2;37HTimer   "));
    }

    #[test]
    fn ansi_update_redraws_only_changed_slots() {
        let display = AnsiDisplay::new(Vec::new());
        display
            .update(
                &Actor::player("alex"),
                PanelId::from_raw(1),
                &[SlotChange {
                    index: 10,
                    content: None,
                }],
            )
            .unwrap();
        let rendered = String::from_utf8(display.into_inner().unwrap()).unwrap();
        assert!(rendered.contains("\u{1b}[3;10H·"));
        assert!(!rendered.contains("Shop"));
    }
}
