//! Client core for the coffee menu selector: menu backend access, the cached
//! catalog query, order submission and the selection flow.

pub mod config;
pub mod error;
pub mod menus;
pub mod mutation;
pub mod query;
pub mod screen;
pub mod selection;
pub mod source;

pub use config::{load_settings, ClientSettings};
pub use error::ClientError;
pub use menus::MenuClient;
pub use mutation::{MutationState, SubmitOrderMutation};
pub use query::{Query, QueryClient, QueryKey, QueryOptions, QueryState};
pub use screen::{MenuScreen, Notification, ScreenView};
pub use selection::{SelectionController, SelectionSet, SubmissionOutcome};
pub use source::{HttpMenuSource, MenuDataSource, MockMenuSource};

#[cfg(test)]
#[path = "tests/support.rs"]
mod tests_support;
