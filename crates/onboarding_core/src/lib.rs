//! Client-side state for the onboarding logistics tool.
//!
//! Three independent stores (banking items, employees, new starters) each own
//! an in-memory copy of their records, expose derived views as pure functions
//! of a state snapshot, and reconcile remote action results back into that
//! state. Presentation code subscribes to [`StoreEvent`]s and re-reads a
//! snapshot when notified.

pub mod banking;
pub mod employee;
pub mod error;
pub mod new_starter;
pub mod remote;
pub mod settings;
mod store;

pub use banking::{
    BankingFilterUpdate, BankingFilters, BankingState, BankingStats, BankingStore, Selection,
    SortKey,
};
pub use employee::{EmployeeState, EmployeeStore, EmployeeUpdate};
pub use error::{ActionError, ActionResult, RemoteError, RemoteResult};
pub use new_starter::{NewStarterState, NewStarterStore};
pub use remote::{HttpRemote, OnboardingRemote};
pub use settings::{load_settings, ClientSettings};
pub use store::{StoreEvent, StoreKind};

#[cfg(test)]
#[path = "tests/fake_remote.rs"]
mod fake_remote;
