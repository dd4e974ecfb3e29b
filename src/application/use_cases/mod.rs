mod channel_enumerator;
mod context_window;
mod search_messages;
mod sync_status;
mod sync_workspace;

pub use channel_enumerator::*;
pub use context_window::*;
pub use search_messages::*;
pub use sync_status::*;
pub use sync_workspace::*;
