use serde::{Deserialize, Serialize};

use pitboss_core::types::Timestamp;
use pitboss_core::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    PlayerCashless,
    OperatorLiability,
    DeviceEscrow,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::PlayerCashless => "player_cashless",
            AccountType::OperatorLiability => "operator_liability",
            AccountType::DeviceEscrow => "device_escrow",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "operator_liability" => AccountType::OperatorLiability,
            "device_escrow" => AccountType::DeviceEscrow,
            _ => AccountType::PlayerCashless,
        }
    }

    fn for_account_id(id: &str) -> Self {
        if id == "operator_liability" {
            AccountType::OperatorLiability
        } else if id == "device_escrow" || id.starts_with("device_escrow:") {
            AccountType::DeviceEscrow
        } else {
            AccountType::PlayerCashless
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerAccount {
    pub id: String,
    #[sqlx(rename = "account_type")]
    pub account_type_raw: String,
    pub currency: String,
    pub available_minor: i64,
    pub pending_minor: i64,
    pub status: String,
}

impl LedgerAccount {
    pub fn new_lazy(id: &str, currency: &str) -> Self {
        Self {
            id: id.to_string(),
            account_type_raw: AccountType::for_account_id(id).as_str().to_string(),
            currency: currency.to_string(),
            available_minor: 0,
            pending_minor: 0,
            status: "active".to_string(),
        }
    }

    pub fn account_type(&self) -> AccountType {
        AccountType::from_str(&self.account_type_raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn sign(self) -> i64 {
        match self {
            Direction::Debit => -1,
            Direction::Credit => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub tx_id: String,
    pub account_id: String,
    pub direction: Direction,
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferToDevice,
    TransferToAccount,
    GameplayDebit,
    GameplayCredit,
    ManualAdjustment,
}

impl TransactionType {
    pub fn as_wire(self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::TransferToDevice => "TRANSFER_TO_DEVICE",
            TransactionType::TransferToAccount => "TRANSFER_TO_ACCOUNT",
            TransactionType::GameplayDebit => "GAMEPLAY_DEBIT",
            TransactionType::GameplayCredit => "GAMEPLAY_CREDIT",
            TransactionType::ManualAdjustment => "MANUAL_ADJUSTMENT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub tx_id: String,
    pub account_id: String,
    pub tx_type: String,
    pub amount_minor: i64,
    pub currency: String,
    pub occurred_at: Timestamp,
    pub authorization_id: Option<String>,
    pub description: Option<String>,
    pub transfer_id: Option<String>,
    pub transfer_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Completed,
    Partial,
    Denied,
}

impl TransferStatus {
    pub fn as_wire(self) -> &'static str {
        match self {
            TransferStatus::Completed => "TRANSFER_STATUS_COMPLETED",
            TransferStatus::Partial => "TRANSFER_STATUS_PARTIAL",
            TransferStatus::Denied => "TRANSFER_STATUS_DENIED",
        }
    }
}

pub fn money(amount_minor: i64, currency: &str) -> Money {
    Money::new(amount_minor, currency)
}
