//! Declarative panel templates.
//!
//! A pattern is a list of lines, one per panel row, where each character
//! stands for a piece of content. Only characters that have content mapped
//! to them take up a slot; everything else on a line is skipped entirely.
//!
//! # Example
//! ```
//! use grid_panel::{CellContent, LayoutPattern};
//!
//! let border = LayoutPattern::of_lines(["#########", "#       #", "#########"])
//!     .with_content('#', CellContent::of("black_stained_glass_pane"))
//!     .start_at_line(2);
//!
//! let placements = border.placements(54);
//! assert_eq!(placements[0].index, 9);
//! ```

use std::collections::HashMap;

use crate::content::CellContent;
use crate::geometry::{COLUMNS, line_offset};

/// Content destined for a slot. `index` is signed because a pattern started
/// above the first line produces negative slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub index: i64,
    pub content: CellContent,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutPattern {
    lines: Vec<String>,
    content_map: HashMap<char, CellContent>,
    start_index: i64,
}

impl LayoutPattern {
    /// Lines should be nine characters wide; extra placements per line are
    /// ignored.
    pub fn of_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            content_map: HashMap::new(),
            start_index: 0,
        }
    }

    /// Map `symbol` to the content it stands for.
    pub fn with_content(mut self, symbol: char, content: CellContent) -> Self {
        self.content_map.insert(symbol, content);
        self
    }

    /// Start at a 1-based panel line.
    pub fn start_at_line(mut self, line: i64) -> Self {
        self.start_index = line_offset(line);
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn start_index(&self) -> i64 {
        self.start_index
    }

    pub fn content_for(&self, symbol: char) -> Option<&CellContent> {
        self.content_map.get(&symbol)
    }

    /// Placements this pattern makes on a panel with `size` slots, in the
    /// order they are written.
    ///
    /// Each mapped character consumes one slot and one column; unmapped
    /// characters consume neither. A line stops after nine placements. At the
    /// end of a line the cursor moves by `8 - placements_on_line`, so a full
    /// line advances the cursor by eight overall and the next line begins on
    /// the last slot of the previous row. Placement stops for good as soon as
    /// the cursor passes the last slot.
    pub fn placements(&self, size: usize) -> Vec<Placement> {
        let last = size as i64 - 1;
        let max_column = COLUMNS as i64 - 1;
        let mut index = self.start_index;
        let mut out = Vec::new();

        for line in &self.lines {
            let mut pos: i64 = 0;
            for symbol in line.chars() {
                if index > last {
                    return out;
                }
                if pos > max_column {
                    break;
                }
                if let Some(content) = self.content_map.get(&symbol) {
                    out.push(Placement {
                        index,
                        content: content.clone(),
                    });
                    index += 1;
                    pos += 1;
                }
            }
            index = index.saturating_add(max_column - pos);
        }

        out
    }
}
