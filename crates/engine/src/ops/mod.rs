use sea_orm::DatabaseConnection;

use crate::ResultEngine;

mod access;
mod intake;
mod matching;
mod obligations;
mod receipts;
mod settlement;
mod summary;
#[cfg(test)]
mod testing;

pub use matching::MatchQuery;
pub use obligations::{
    GeneratedObligation, ObligationDetail, ObligationLink, ObligationListFilter, ObligationPage,
    ObligationRow, ReconcileOutcome,
};
pub use receipts::{ReceiptDetail, ReceiptLink, ReceiptListFilter, ReceiptPage};
pub use settlement::{SettledItem, SettlementOutcome};
pub use summary::{PayeeSummary, PayeeSummaryFilter, PayeeSummaryPage};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    require_confirmed_receipts: bool,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    require_confirmed_receipts: bool,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Refuse to settle receipts that are still waiting for confirmation.
    ///
    /// Off by default: an unconfirmed receipt is settled with a warning.
    pub fn require_confirmed_receipts(mut self, required: bool) -> EngineBuilder {
        self.require_confirmed_receipts = required;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            require_confirmed_receipts: self.require_confirmed_receipts,
        })
    }
}

