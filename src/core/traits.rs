//! Core traits shared by the store and the engine
//!
//! [`Record`] lets one generic table implementation hold every entity kind;
//! [`Owned`] lets the engine run the same ownership check against any of them.

use crate::types::*;

/// A row stored in a [`crate::core::table::Table`]
pub trait Record: Clone + Send + Sync + 'static {
    /// Entity name used in error messages
    const ENTITY: &'static str;

    fn id(&self) -> u32;
}

/// A row that belongs to exactly one user
pub trait Owned: Record {
    fn owner(&self) -> UserId;
}

macro_rules! record {
    ($ty:ty, $entity:literal) => {
        impl Record for $ty {
            const ENTITY: &'static str = $entity;

            fn id(&self) -> u32 {
                self.id
            }
        }
    };
    ($ty:ty, $entity:literal, owned) => {
        record!($ty, $entity);

        impl Owned for $ty {
            fn owner(&self) -> UserId {
                self.user_id
            }
        }
    };
}

record!(User, "user");
record!(Account, "account", owned);
record!(Transaction, "transaction");
record!(Bill, "bill", owned);
record!(BillPayment, "bill payment", owned);
record!(ExternalBankAccount, "external account", owned);
record!(InternationalTransfer, "international transfer", owned);
record!(LoanProduct, "loan");
record!(LoanApplication, "loan application", owned);
record!(CryptoTransferRequest, "crypto transfer request", owned);
record!(TransferRequest, "transfer request", owned);
