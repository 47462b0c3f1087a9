//! pitboss-ledger
//!
//! The double-entry ledger (§4.2): accounts, postings, transactions, and
//! the idempotent deposit/withdraw/transfer surface.

pub mod idempotency;
pub mod model;
pub mod requests;
pub mod service;

pub use model::{money, AccountType, Direction, LedgerAccount, LedgerTransaction, Posting, TransactionType, TransferStatus};
pub use requests::{
    BalanceResponse, ListTransactionsRequest, ListTransactionsResponse, MutationRequest, MutationResponse,
    TransferResponse, TransferToDeviceRequest,
};
pub use service::LedgerService;
