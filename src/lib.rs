//! Lifecycle ledger for negotiable trade-finance instruments
//!
//! Letters of credit and supply-chain financing papers are stored as
//! [`record::Record`]s keyed by issuer and paper number. Each instrument
//! variant has a static [`workflow::Workflow`] table and every mutation goes
//! through the [`engine`], which checks the current state and the asserted
//! owner before anything is written. [`contract::Contract`] exposes the named
//! business operations over a caller-supplied
//! [`world_state::TransactionContext`].

pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod logging;
pub mod record;
pub mod store;
pub mod workflow;
pub mod world_state;

pub use contract::{Contract, TransitionRequest};
pub use error::LedgerError;
pub use record::{CompositeKey, Record};
pub use store::RecordStore;
pub use world_state::{MemoryWorldState, SledWorldState, TransactionContext};
