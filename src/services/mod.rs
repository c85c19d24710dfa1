pub mod clipboard;
pub mod dedup;
pub mod pointer_listener;
pub mod pointer_locator;
pub mod process_names;
pub mod selection_source;
pub mod virtual_device;

pub use clipboard::{ClipboardAccess, SystemClipboard};
pub use dedup::{Deduplicator, SelectionDispatcher};
pub use pointer_listener::PointerListener;
pub use pointer_locator::{PointerLocator, PointerPosition};
pub use process_names::process_name;
pub use selection_source::{create_selection_sources, SelectionSourceTrait};
pub use virtual_device::{CopyTrigger, VirtualDevice};
