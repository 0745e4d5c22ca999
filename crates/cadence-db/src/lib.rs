//! Media item persistence for the transcoding orchestrator.
//!
//! Every state transition is a single conditional update that names the
//! expected prior state, so concurrent callers cannot both win.

pub mod media_item;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod store;

pub use media_item::MediaItemRepository;
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::InMemoryMediaItemStore;
pub use store::MediaItemStore;
