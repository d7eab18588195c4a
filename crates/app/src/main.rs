use chrono::Utc;
use clap::Parser;
use engine::{
    Engine, GenerateObligationsCmd, MatchQuery, NewDeliveryCmd, NewWeighbillCmd,
    ObligationListFilter, PayeeSummaryFilter, ReceiptListFilter, RecordReceiptCmd,
    SettleByPayeeCmd, SettleExplicitCmd,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;

use cli::{
    Cli, Command, DbCommand, DeliveryCommand, ObligationsCommand, ReceiptsCommand, SettleCommand,
    WeighbillCommand,
};
use settings::Database;

mod cli;
mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "payledger={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = match cli.database_url.as_deref() {
        Some(url) => sea_orm::Database::connect(url).await?,
        None => parse_database(&settings.database).await?,
    };

    if let Command::Db { command } = cli.command {
        return run_db(&db, command).await;
    }
    Migrator::up(&db, None).await?;

    let engine = Engine::builder()
        .database(db)
        .require_confirmed_receipts(settings.settlement.require_confirmed_receipts)
        .build()
        .await?;

    if let Err(err) = run(&engine, cli.command).await {
        tracing::error!("{err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn parse_database(config: &Database) -> Result<DatabaseConnection, BoxError> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    Ok(sea_orm::Database::connect(url).await?)
}

async fn run_db(db: &DatabaseConnection, command: DbCommand) -> Result<(), BoxError> {
    match command {
        DbCommand::Up => Migrator::up(db, None).await?,
        DbCommand::Down => Migrator::down(db, None).await?,
        DbCommand::Fresh => Migrator::fresh(db).await?,
        DbCommand::Status => Migrator::status(db).await?,
    }
    tracing::info!("database command done");
    Ok(())
}

fn print<T: Serialize>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(engine: &Engine, command: Command) -> Result<(), BoxError> {
    let now = Utc::now();
    match command {
        Command::Db { .. } => {}
        Command::Delivery {
            command: DeliveryCommand::Add(args),
        } => {
            let mut cmd = NewDeliveryCmd::new(args.driver, now);
            if let Some(phone) = args.phone {
                cmd = cmd.driver_phone(phone);
            }
            if let Some(vehicle) = args.vehicle {
                cmd = cmd.vehicle_no(vehicle);
            }
            if let Some(contract) = args.contract {
                cmd = cmd.contract_no(contract);
            }
            let id = engine.record_delivery(cmd).await?;
            print(&json!({ "id": id }))?;
        }
        Command::Weighbill { command } => match command {
            WeighbillCommand::Add(args) => {
                let mut cmd = NewWeighbillCmd::new(args.weight, args.price, now);
                if let Some(contract) = args.contract {
                    cmd = cmd.contract_no(contract);
                }
                if let Some(delivery) = args.delivery {
                    cmd = cmd.delivery_id(delivery);
                }
                if let Some(vehicle) = args.vehicle {
                    cmd = cmd.vehicle_no(vehicle);
                }
                if let Some(product) = args.product {
                    cmd = cmd.product_name(product);
                }
                if let Some(date) = args.date {
                    cmd = cmd.weigh_date(date);
                }
                let id = engine.record_weighbill(cmd).await?;
                print(&json!({ "id": id }))?;
            }
            WeighbillCommand::Confirm { id } => {
                engine.confirm_weighbill(id).await?;
                print(&engine.weighbill(id).await?)?;
            }
        },
        Command::Obligations { command } => match command {
            ObligationsCommand::Generate {
                contract,
                delivery,
                weighbill,
            } => {
                let mut cmd = GenerateObligationsCmd::new(now);
                if let Some(contract) = contract {
                    cmd = cmd.contract_no(contract);
                }
                if let Some(delivery) = delivery {
                    cmd = cmd.delivery_id(delivery);
                }
                if let Some(weighbill) = weighbill {
                    cmd = cmd.weighbill_id(weighbill);
                }
                print(&engine.generate_obligations(cmd).await?)?;
            }
            ObligationsCommand::List(args) => {
                let filter = ObligationListFilter {
                    contract_no: args.contract,
                    driver_name: args.payee,
                    status: args.status,
                    keywords: args.keywords,
                    page: args.page.page,
                    page_size: args.page.page_size,
                };
                print(&engine.list_obligations(&filter).await?)?;
            }
            ObligationsCommand::Show { id } => print(&engine.obligation(id).await?)?,
            ObligationsCommand::Reconcile { id } => {
                print(&engine.reconcile_obligation(id, now).await?)?;
            }
        },
        Command::Receipts { command } => match command {
            ReceiptsCommand::Add(args) => {
                let mut cmd = RecordReceiptCmd::new(args.payee, args.amount, args.date, now)
                    .manual(args.manual)
                    .payee_account(args.payee_account, args.payee_bank);
                if let Some(fee) = args.fee {
                    cmd = cmd.fee(fee);
                }
                if let Some(total) = args.total {
                    cmd = cmd.total(total);
                }
                if let Some(time) = args.time {
                    cmd = cmd.payment_time(time);
                }
                if let Some(receipt_no) = args.receipt_no {
                    cmd = cmd.receipt_no(receipt_no);
                }
                if let Some(payer) = args.payer {
                    cmd = cmd.payer(payer, args.payer_account, args.payer_bank);
                }
                if let Some(remark) = args.remark {
                    cmd = cmd.remark(remark);
                }
                let id = engine.record_receipt(cmd).await?;
                print(&json!({ "id": id }))?;
            }
            ReceiptsCommand::Confirm { id } => {
                let status = engine.confirm_receipt(id).await?;
                print(&json!({ "id": id, "status": status }))?;
            }
            ReceiptsCommand::List(args) => {
                let filter = ReceiptListFilter {
                    payee_name: args.payee,
                    status: args.status,
                    from: args.from,
                    to: args.to,
                    keywords: args.keywords,
                    page: args.page.page,
                    page_size: args.page.page_size,
                };
                print(&engine.list_receipts(&filter).await?)?;
            }
            ReceiptsCommand::Show { id } => print(&engine.receipt(id).await?)?,
        },
        Command::Match(args) => {
            let query = MatchQuery::new(args.payee, args.amount, now).lookback_days(args.days);
            print(&engine.find_candidate_matches(&query).await?)?;
        }
        Command::Settle { command } => {
            let outcome = match command {
                SettleCommand::Explicit { receipt, items } => {
                    engine
                        .settle_explicit(SettleExplicitCmd::new(receipt, now).items(items))
                        .await?
                }
                SettleCommand::Payee {
                    payee,
                    receipt,
                    phone,
                } => {
                    let mut cmd = SettleByPayeeCmd::new(payee, receipt, now);
                    if let Some(phone) = phone {
                        cmd = cmd.driver_phone(phone);
                    }
                    engine.settle_by_payee(cmd).await?
                }
            };
            print(&outcome)?;
        }
        Command::Summary(args) => {
            let filter = PayeeSummaryFilter {
                payee_name: args.payee,
                driver_phone: args.phone,
                keywords: args.keywords,
                min_balance: args.min_balance,
                status: args.status,
                page: args.page.page,
                page_size: args.page.page_size,
            };
            print(&engine.payee_summaries(&filter).await?)?;
        }
    }
    Ok(())
}
