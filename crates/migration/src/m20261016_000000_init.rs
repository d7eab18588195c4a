//! Initial schema migration for the payment ledger.
//!
//! - `deliveries`: shipment batches (driver, phone, vehicle)
//! - `weighbills`: weighbridge tickets, the source of every obligation
//! - `obligations`: payable balances, one per confirmed weighbill
//! - `receipts`: incoming payment instruments
//! - `settlement_links`: how much of a receipt was applied to an obligation

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Deliveries {
    Table,
    Id,
    ContractNo,
    DriverName,
    DriverPhone,
    VehicleNo,
    CreatedAt,
}

#[derive(Iden)]
enum Weighbills {
    Table,
    Id,
    ContractNo,
    DeliveryId,
    VehicleNo,
    ProductName,
    NetWeightMilli,
    UnitPriceMinor,
    WeighDate,
    Confirmed,
    CreatedAt,
}

#[derive(Iden)]
enum Obligations {
    Table,
    Id,
    WeighbillId,
    ContractNo,
    DeliveryId,
    DriverName,
    DriverPhone,
    VehicleNo,
    PayableMinor,
    PaidMinor,
    BalanceMinor,
    Status,
    Version,
    Seq,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    ReceiptNo,
    PaymentDate,
    PaymentTime,
    PayerName,
    PayerAccount,
    PayerBank,
    PayeeName,
    PayeeAccount,
    PayeeBank,
    AmountMinor,
    FeeMinor,
    TotalMinor,
    Remark,
    Status,
    IsManual,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SettlementLinks {
    Table,
    ReceiptId,
    ObligationId,
    SettledMinor,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Deliveries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Deliveries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deliveries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Deliveries::ContractNo).string())
                    .col(ColumnDef::new(Deliveries::DriverName).string().not_null())
                    .col(ColumnDef::new(Deliveries::DriverPhone).string())
                    .col(ColumnDef::new(Deliveries::VehicleNo).string())
                    .col(
                        ColumnDef::new(Deliveries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Weighbills
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Weighbills::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Weighbills::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Weighbills::ContractNo).string())
                    .col(ColumnDef::new(Weighbills::DeliveryId).string())
                    .col(ColumnDef::new(Weighbills::VehicleNo).string())
                    .col(ColumnDef::new(Weighbills::ProductName).string())
                    .col(
                        ColumnDef::new(Weighbills::NetWeightMilli)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Weighbills::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Weighbills::WeighDate).date())
                    .col(
                        ColumnDef::new(Weighbills::Confirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Weighbills::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-weighbills-delivery_id")
                            .from(Weighbills::Table, Weighbills::DeliveryId)
                            .to(Deliveries::Table, Deliveries::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-weighbills-contract_no")
                    .table(Weighbills::Table)
                    .col(Weighbills::ContractNo)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Obligations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Obligations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Obligations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Obligations::WeighbillId).string().not_null())
                    .col(ColumnDef::new(Obligations::ContractNo).string())
                    .col(ColumnDef::new(Obligations::DeliveryId).string())
                    .col(ColumnDef::new(Obligations::DriverName).string())
                    .col(ColumnDef::new(Obligations::DriverPhone).string())
                    .col(ColumnDef::new(Obligations::VehicleNo).string())
                    .col(
                        ColumnDef::new(Obligations::PayableMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Obligations::PaidMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Obligations::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Obligations::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Obligations::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Obligations::Seq)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Obligations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Obligations::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-obligations-weighbill_id")
                            .from(Obligations::Table, Obligations::WeighbillId)
                            .to(Weighbills::Table, Weighbills::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one obligation per weighbill, even under concurrent generation.
        manager
            .create_index(
                Index::create()
                    .name("idx-obligations-weighbill_id-unique")
                    .table(Obligations::Table)
                    .col(Obligations::WeighbillId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Generation order, used to break `created_at` ties.
        manager
            .create_index(
                Index::create()
                    .name("idx-obligations-seq-unique")
                    .table(Obligations::Table)
                    .col(Obligations::Seq)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-obligations-driver_name-status")
                    .table(Obligations::Table)
                    .col(Obligations::DriverName)
                    .col(Obligations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-obligations-created_at")
                    .table(Obligations::Table)
                    .col(Obligations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Receipts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Receipts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Receipts::ReceiptNo).string())
                    .col(ColumnDef::new(Receipts::PaymentDate).date().not_null())
                    .col(ColumnDef::new(Receipts::PaymentTime).time())
                    .col(ColumnDef::new(Receipts::PayerName).string())
                    .col(ColumnDef::new(Receipts::PayerAccount).string())
                    .col(ColumnDef::new(Receipts::PayerBank).string())
                    .col(ColumnDef::new(Receipts::PayeeName).string().not_null())
                    .col(ColumnDef::new(Receipts::PayeeAccount).string())
                    .col(ColumnDef::new(Receipts::PayeeBank).string())
                    .col(
                        ColumnDef::new(Receipts::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Receipts::FeeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Receipts::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Receipts::Remark).string())
                    .col(
                        ColumnDef::new(Receipts::Status)
                            .string()
                            .not_null()
                            .default("pending_confirmation"),
                    )
                    .col(
                        ColumnDef::new(Receipts::IsManual)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Receipts::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Receipts::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Receipts::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-payee_name-amount_minor")
                    .table(Receipts::Table)
                    .col(Receipts::PayeeName)
                    .col(Receipts::AmountMinor)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-payment_date")
                    .table(Receipts::Table)
                    .col(Receipts::PaymentDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Settlement links
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SettlementLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SettlementLinks::ReceiptId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementLinks::ObligationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementLinks::SettledMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementLinks::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementLinks::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SettlementLinks::ReceiptId)
                            .col(SettlementLinks::ObligationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-settlement_links-receipt_id")
                            .from(SettlementLinks::Table, SettlementLinks::ReceiptId)
                            .to(Receipts::Table, Receipts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-settlement_links-obligation_id")
                            .from(SettlementLinks::Table, SettlementLinks::ObligationId)
                            .to(Obligations::Table, Obligations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlement_links-obligation_id")
                    .table(SettlementLinks::Table)
                    .col(SettlementLinks::ObligationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(SettlementLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Obligations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Weighbills::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deliveries::Table).to_owned())
            .await?;
        Ok(())
    }
}
