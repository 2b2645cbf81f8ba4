//! Daily generation quota.
//!
//! [`QuotaGate`] is a pure decision over a [`QuotaState`]; [`QuotaLedger`]
//! owns the persisted state for one user.

mod gate;
mod ledger;
mod types;

pub use gate::QuotaGate;
pub use ledger::QuotaLedger;
pub use types::{QuotaPolicy, QuotaState, QuotaTier};
