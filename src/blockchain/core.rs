// core.rs splits chain responsibilities into submodules for easier
// maintenance: block/chain management, ledger state, and the structural
// checks commits repeat.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use state::*;
