//! Fulfillment and wallet engine for the Atelia marketplace.
//!
//! The engine owns the order fulfillment progression (orders → milestones →
//! tasks), the wallet/transaction ledger and the membership reconciliation
//! logic. Every operation runs against the database inside a single
//! transaction; callers identify themselves explicitly on each call.

pub use error::EngineError;
pub use memberships::{Membership, MembershipStatus};
pub use milestones::{Milestone, ProgressStatus};
pub use ops::{Engine, EngineBuilder, MilestonePatch, NewMilestone, NewTask};
pub use orders::{Order, OrderStatus};
pub use tasks::Task;
pub use transactions::{BalanceKind, Transaction, TransactionKind, TransactionStatus};
pub use update_requests::{UpdateRequest, UpdateRequestStatus};
pub use subscriptions::Subscription;
pub use wallets::Wallet;

mod error;
mod memberships;
mod milestones;
mod ops;
mod orders;
mod shops;
mod subscriptions;
mod tasks;
mod transactions;
mod update_requests;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
