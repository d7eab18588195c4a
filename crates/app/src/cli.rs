use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use engine::{Money, ObligationStatus, ReceiptStatus, SettlementItem, Weight};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "payledger")]
#[command(about = "Obligations, receipts and settlement for weighbridge deliveries")]
pub struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    ///
    /// Overrides the `database` section of the settings.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Schema migrations.
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    /// Shipment batches.
    Delivery {
        #[command(subcommand)]
        command: DeliveryCommand,
    },
    /// Weighbridge tickets.
    Weighbill {
        #[command(subcommand)]
        command: WeighbillCommand,
    },
    Obligations {
        #[command(subcommand)]
        command: ObligationsCommand,
    },
    Receipts {
        #[command(subcommand)]
        command: ReceiptsCommand,
    },
    /// Suggest obligations a payment probably belongs to.
    Match(MatchArgs),
    Settle {
        #[command(subcommand)]
        command: SettleCommand,
    },
    /// Outstanding balance per payee.
    Summary(SummaryArgs),
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    Up,
    Down,
    Fresh,
    Status,
}

#[derive(Subcommand, Debug)]
pub enum DeliveryCommand {
    Add(DeliveryAddArgs),
}

#[derive(Args, Debug)]
pub struct DeliveryAddArgs {
    #[arg(long)]
    pub driver: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub vehicle: Option<String>,
    #[arg(long)]
    pub contract: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum WeighbillCommand {
    Add(WeighbillAddArgs),
    Confirm { id: Uuid },
}

#[derive(Args, Debug)]
pub struct WeighbillAddArgs {
    /// Net weight in tons, up to three decimals.
    #[arg(long)]
    pub weight: Weight,
    /// Price per ton.
    #[arg(long)]
    pub price: Money,
    #[arg(long)]
    pub contract: Option<String>,
    #[arg(long)]
    pub delivery: Option<Uuid>,
    #[arg(long)]
    pub vehicle: Option<String>,
    #[arg(long)]
    pub product: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum ObligationsCommand {
    /// Create obligations for confirmed weighbills that have none.
    Generate {
        #[arg(long)]
        contract: Option<String>,
        #[arg(long)]
        delivery: Option<Uuid>,
        #[arg(long)]
        weighbill: Option<Uuid>,
    },
    List(ObligationsListArgs),
    Show { id: Uuid },
    /// Recompute paid/balance/status from settlement links.
    Reconcile { id: Uuid },
}

#[derive(Args, Debug)]
pub struct ObligationsListArgs {
    #[arg(long)]
    pub contract: Option<String>,
    #[arg(long)]
    pub payee: Option<String>,
    #[arg(long, value_parser = parse_obligation_status)]
    pub status: Option<ObligationStatus>,
    #[arg(long)]
    pub keywords: Option<String>,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Subcommand, Debug)]
pub enum ReceiptsCommand {
    Add(ReceiptAddArgs),
    Confirm { id: Uuid },
    List(ReceiptsListArgs),
    Show { id: Uuid },
}

#[derive(Args, Debug)]
pub struct ReceiptAddArgs {
    #[arg(long)]
    pub payee: String,
    #[arg(long)]
    pub amount: Money,
    /// Payment date (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub time: Option<NaiveTime>,
    #[arg(long)]
    pub fee: Option<Money>,
    /// Defaults to amount + fee.
    #[arg(long)]
    pub total: Option<Money>,
    #[arg(long)]
    pub receipt_no: Option<String>,
    #[arg(long)]
    pub payer: Option<String>,
    #[arg(long)]
    pub payer_account: Option<String>,
    #[arg(long)]
    pub payer_bank: Option<String>,
    #[arg(long)]
    pub payee_account: Option<String>,
    #[arg(long)]
    pub payee_bank: Option<String>,
    #[arg(long)]
    pub remark: Option<String>,
    /// Typed in by an operator: the receipt starts confirmed.
    #[arg(long)]
    pub manual: bool,
}

#[derive(Args, Debug)]
pub struct ReceiptsListArgs {
    #[arg(long)]
    pub payee: Option<String>,
    #[arg(long, value_parser = parse_receipt_status)]
    pub status: Option<ReceiptStatus>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub keywords: Option<String>,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Part of the payee name.
    #[arg(long)]
    pub payee: String,
    #[arg(long)]
    pub amount: Money,
    #[arg(long, default_value_t = 30)]
    pub days: u32,
}

#[derive(Subcommand, Debug)]
pub enum SettleCommand {
    /// Apply a receipt to the given obligations, in order.
    Explicit {
        #[arg(long)]
        receipt: Uuid,
        /// `OBLIGATION_ID=AMOUNT`, repeatable.
        #[arg(long = "item", required = true, value_parser = parse_item)]
        items: Vec<SettlementItem>,
    },
    /// Spread a receipt over a payee's obligations, oldest first.
    Payee {
        #[arg(long)]
        payee: String,
        #[arg(long)]
        receipt: Uuid,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[arg(long)]
    pub payee: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub keywords: Option<String>,
    #[arg(long, default_value = "0.01")]
    pub min_balance: Money,
    #[arg(long, value_parser = parse_obligation_status)]
    pub status: Option<ObligationStatus>,
    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u64,
    #[arg(long, default_value_t = 20)]
    pub page_size: u64,
}

fn parse_obligation_status(raw: &str) -> Result<ObligationStatus, String> {
    ObligationStatus::try_from(raw).map_err(|err| err.to_string())
}

fn parse_receipt_status(raw: &str) -> Result<ReceiptStatus, String> {
    ReceiptStatus::try_from(raw).map_err(|err| err.to_string())
}

fn parse_item(raw: &str) -> Result<SettlementItem, String> {
    let (id, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected OBLIGATION_ID=AMOUNT, got {raw}"))?;
    let obligation_id = Uuid::parse_str(id.trim()).map_err(|err| err.to_string())?;
    let amount = amount.parse::<Money>().map_err(|err| err.to_string())?;
    Ok(SettlementItem::new(obligation_id, amount))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn settle_items_parse() {
        let cli = Cli::try_parse_from([
            "payledger",
            "settle",
            "explicit",
            "--receipt",
            "0b4f8a4e-5a47-4b0c-9b39-0d7d9c1b8f10",
            "--item",
            "7c0a2d6e-8a53-4d54-8f43-5b3e0d8f2f11=3000",
            "--item",
            "7c0a2d6e-8a53-4d54-8f43-5b3e0d8f2f12=12,50",
        ])
        .unwrap();
        let Command::Settle {
            command: SettleCommand::Explicit { items, .. },
        } = cli.command
        else {
            panic!("wrong subcommand");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].amount, Money::new(300_000));
        assert_eq!(items[1].amount, Money::new(1_250));
    }

    #[test]
    fn bad_item_is_rejected() {
        assert!(parse_item("not-a-pair").is_err());
        assert!(parse_item("7c0a2d6e-8a53-4d54-8f43-5b3e0d8f2f11=1.234").is_err());
    }
}
