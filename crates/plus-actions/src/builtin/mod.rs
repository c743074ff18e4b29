//! Actions compiled into every PlusScript host
//!
//! - `noop-success` / `noop-failure`: fixed outcomes, useful for wiring tests
//! - `echo`: returns its inputs as outputs
//! - `psee-validator`: static checks over a PlusScript document

mod echo;
mod noop;
mod validator;

pub use echo::Echo;
pub use noop::{NoopFailure, NoopSuccess};
pub use validator::ScriptValidator;
