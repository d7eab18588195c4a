//! Settlement ledger: turns confirmed weighbills into payable obligations,
//! records payment receipts and applies receipt money to obligations.
//!
//! All operations are `async` methods on [`Engine`], each running in its own
//! database transaction.

pub use commands::{
    GenerateObligationsCmd, NewDeliveryCmd, NewWeighbillCmd, RecordReceiptCmd, SettleByPayeeCmd,
    SettleExplicitCmd, SettlementItem,
};
pub use deliveries::Delivery;
pub use error::EngineError;
pub use money::Money;
pub use obligations::Obligation;
pub use ops::{
    Engine, EngineBuilder, GeneratedObligation, MatchQuery, ObligationDetail, ObligationLink,
    ObligationListFilter, ObligationPage, ObligationRow, PayeeSummary, PayeeSummaryFilter,
    PayeeSummaryPage, ReceiptDetail, ReceiptLink, ReceiptListFilter, ReceiptPage,
    ReconcileOutcome, SettledItem, SettlementOutcome,
};
pub use receipts::Receipt;
pub use status::{ObligationStatus, ReceiptStatus};
pub use weighbills::Weighbill;
pub use weight::{Weight, payable_amount};

mod commands;
mod deliveries;
mod error;
mod money;
mod obligations;
mod ops;
mod receipts;
mod settlement_links;
mod status;
mod util;
mod weighbills;
mod weight;

type ResultEngine<T> = Result<T, EngineError>;
