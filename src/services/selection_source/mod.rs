//! Источники выделений: подписка AT-SPI и проба буфера обмена.
//!
//! Источники только обнаруживают выделение и отдают `SelectionEvent` в
//! `SelectionDispatcher`. Дедупликация и доставка в канал делаются там.

mod accessibility;
mod atspi;
mod clipboard_probe;
mod dry_selection_source;
mod r#trait;

pub use self::accessibility::{
    AccessibilityBus, AccessibilitySource, AccessibleRef, Notification, NotificationKind, RawSelection,
};
pub use self::atspi::AtspiBus;
pub use self::clipboard_probe::{ClipboardProbe, ClipboardProbeSource, ProbeTimings};
pub use self::dry_selection_source::DrySelectionSource;
pub use self::r#trait::{create_selection_sources, SelectionSourceTrait};
