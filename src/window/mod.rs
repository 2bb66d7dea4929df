//! Window enumeration model, title matching and minimized-window handling.

pub mod fuzzy;
pub mod matcher;
pub mod minimized;
pub mod system;
pub mod types;

pub use matcher::{find_matching_window, MatchMode, MatchQuery, DEFAULT_FUZZY_THRESHOLD};
pub use minimized::MinimizedWindowController;
pub use system::{ensure_live, WindowSystem};
pub use types::{WindowDescriptor, WindowHandle, MINIMIZED_SENTINEL};
