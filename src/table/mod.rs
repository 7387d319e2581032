pub mod aggregate;
pub mod reconcile;

pub use aggregate::{ColumnAccumulator, DocumentState};
pub use reconcile::{reconcile, ReconcilePolicy, Reconciled, Truncation};
