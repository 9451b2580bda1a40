//! Services for social authentication.

pub mod reconcile;
pub mod state;

pub use reconcile::{
    Conflict, ConflictKind, ReconcileService, RegistrationPolicy, Resolution,
};
pub use state::{StateClaims, StateService};
