//! Line-indexed text model.
//!
//! The storage unit is the [`Line`]: a non-empty byte string whose last byte
//! is `'\n'`, carrying its cumulative byte offset from the start of the text.
//! [`LineStore`] keeps the ordered line sequence consistent across structural
//! edits; [`TextIter`] walks the stored bytes by `(line, column)` coordinate
//! or absolute offset.
//!
//! Columns are byte offsets within a line. The model is deliberately
//! byte-oriented: grapheme segmentation and display width belong to higher
//! layers. `char_next`/`char_prev` only skip UTF-8 sequences so callers can
//! stay on codepoint boundaries when they care to.

mod coord;
mod iter;
mod store;

pub use coord::Coord;
pub use iter::TextIter;
pub use store::{Line, LineStore};
