pub mod pointer;
pub mod selection;

pub use pointer::{PointerButton, PointerEvent};
pub use selection::{rect_from_bounds, Rect, SelectionEvent, StrategyKind, WireMessage};
