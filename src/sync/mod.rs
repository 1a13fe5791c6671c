//! Dashboard state sync: collection loading, selection repair, report
//! fetching and derived views, driven by a single reducer.

pub mod epoch;
pub mod events;
pub mod loader;
pub mod reducer;
pub mod reports;
pub mod runtime;
pub mod selection;
pub mod state;
pub mod views;

pub use events::{Command, Event, View};
pub use loader::Collections;
pub use reducer::reduce;
pub use runtime::SyncRuntime;
pub use selection::Selection;
pub use state::DashboardState;
pub use views::DerivedViews;
