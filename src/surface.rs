//! The presentation surface the core emits render instructions to.
//!
//! The core never owns layout. It hands the surface ordered fragments
//! and a handful of instructions; the surface decides how they become
//! pixels (or terminal cells). The TUI implementation lives in `ui.rs`;
//! tests use the recording implementation below.

/// One renderable row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Row {
    /// A log line at its absolute position in the file.
    Log { number: u64, text: String },
    /// Muted server-side notice.
    System(String),
    /// Separator between replayed history and live tailing.
    Divider,
}

impl Row {
    pub fn log(number: u64, text: impl Into<String>) -> Self {
        Row::Log {
            number,
            text: text.into(),
        }
    }
}

/// An ordered group of rows emitted as one unit.
pub type Fragment = Vec<Row>;

pub trait Surface {
    /// Add rows at the end. Scroll to the newest row only when `sticky`.
    fn append(&mut self, fragment: Fragment, sticky: bool);

    /// Add rows at the start. The surface must offset its scroll position
    /// by the exact height introduced so visible rows stay stationary.
    fn prepend(&mut self, fragment: Fragment);

    /// Drop everything rendered.
    fn clear(&mut self);

    /// Hide or show the whole view.
    fn set_visible(&mut self, visible: bool);
}

/// Test double that records instructions and models the rendered rows.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSurface {
    pub rows: Vec<Row>,
    pub ops: Vec<SurfaceOp>,
    /// Sum of prepend heights, the scroll offset a real surface would
    /// have applied to keep the view anchored.
    pub anchor_offset: usize,
    pub visible: bool,
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceOp {
    Append { rows: usize, sticky: bool },
    Prepend { rows: usize },
    Clear,
    SetVisible(bool),
}

#[cfg(test)]
impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            visible: true,
            ..Self::default()
        }
    }

    pub fn log_texts(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                Row::Log { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn append(&mut self, fragment: Fragment, sticky: bool) {
        self.ops.push(SurfaceOp::Append {
            rows: fragment.len(),
            sticky,
        });
        self.rows.extend(fragment);
    }

    fn prepend(&mut self, fragment: Fragment) {
        self.ops.push(SurfaceOp::Prepend {
            rows: fragment.len(),
        });
        self.anchor_offset += fragment.len();
        self.rows.splice(0..0, fragment);
    }

    fn clear(&mut self) {
        self.ops.push(SurfaceOp::Clear);
        self.rows.clear();
        self.anchor_offset = 0;
    }

    fn set_visible(&mut self, visible: bool) {
        self.ops.push(SurfaceOp::SetVisible(visible));
        self.visible = visible;
    }
}
