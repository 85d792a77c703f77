//! Initial database migration.
//!
//! Creates the enums, the stock and cash ledgers, the chart of accounts,
//! the journal, every business document table, and the triggers that keep
//! journal lines immutable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: MASTER DATA
        // ============================================================
        db.execute_unprepared(ITEMS_SQL).await?;
        db.execute_unprepared(CHART_OF_ACCOUNTS_SQL).await?;
        db.execute_unprepared(BANKS_SQL).await?;

        // ============================================================
        // PART 3: LEDGERS
        // ============================================================
        db.execute_unprepared(STOCK_MOVEMENTS_SQL).await?;
        db.execute_unprepared(FIFO_MAPPINGS_SQL).await?;
        db.execute_unprepared(JOURNAL_SQL).await?;
        db.execute_unprepared(CASH_MOVEMENTS_SQL).await?;

        // ============================================================
        // PART 4: TRADE DOCUMENTS
        // ============================================================
        db.execute_unprepared(SALES_SQL).await?;
        db.execute_unprepared(PURCHASES_SQL).await?;
        db.execute_unprepared(SALE_RETURNS_SQL).await?;
        db.execute_unprepared(PURCHASE_RETURNS_SQL).await?;

        // ============================================================
        // PART 5: CASH & STOCK DOCUMENTS
        // ============================================================
        db.execute_unprepared(CASH_DOCUMENTS_SQL).await?;
        db.execute_unprepared(STOCK_ADJUSTMENTS_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Chart of accounts classification
CREATE TYPE account_type AS ENUM ('asset', 'liability', 'equity', 'income', 'expense');

-- Journal entry status
CREATE TYPE journal_status AS ENUM ('draft', 'posted', 'reversed');

-- Business document status
CREATE TYPE document_status AS ENUM ('draft', 'confirmed', 'cancelled');

-- How a sale, purchase or return is settled
CREATE TYPE settlement_type AS ENUM ('cash', 'credit');

-- Payment direction
CREATE TYPE payment_direction AS ENUM ('receipt', 'disbursement');

-- Customer overpayment status
CREATE TYPE overpayment_status AS ENUM ('pending', 'refunded', 'converted_to_income');

-- Sale line profit status
CREATE TYPE profit_status AS ENUM ('realized', 'unrealized');

-- Bank kind
CREATE TYPE bank_type AS ENUM ('cash', 'bank');
";

const ITEMS_SQL: &str = r"
CREATE TABLE items (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code            VARCHAR(50) NOT NULL UNIQUE,
    name            VARCHAR(255) NOT NULL,
    stock           NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active       BOOLEAN NOT NULL DEFAULT true,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const CHART_OF_ACCOUNTS_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code            VARCHAR(20) NOT NULL UNIQUE,
    name            VARCHAR(255) NOT NULL,
    account_type    account_type NOT NULL,
    parent_id       UUID REFERENCES chart_of_accounts(id),
    is_active       BOOLEAN NOT NULL DEFAULT true,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_coa_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX idx_coa_parent ON chart_of_accounts(parent_id);
";

const BANKS_SQL: &str = r"
CREATE TABLE banks (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name            VARCHAR(255) NOT NULL,
    bank_type       bank_type NOT NULL DEFAULT 'bank',
    account_id      UUID NOT NULL REFERENCES chart_of_accounts(id),
    opening_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    current_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const STOCK_MOVEMENTS_SQL: &str = r"
-- One row per cost layer; remaining_quantity is drawn down by consumption
CREATE TABLE stock_movements (
    id                  BIGSERIAL PRIMARY KEY,
    item_id             UUID NOT NULL REFERENCES items(id),
    quantity            NUMERIC(19, 4) NOT NULL,
    unit_cost           NUMERIC(19, 4) NOT NULL,
    remaining_quantity  NUMERIC(19, 4) NOT NULL,
    movement_date       DATE NOT NULL,
    origin_type         VARCHAR(40) NOT NULL,
    origin_id           UUID NOT NULL,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_layer_quantity_positive CHECK (quantity > 0),
    CONSTRAINT chk_layer_unit_cost CHECK (unit_cost >= 0),
    CONSTRAINT chk_layer_remaining CHECK (remaining_quantity >= 0 AND remaining_quantity <= quantity)
);

CREATE INDEX idx_stock_movements_open ON stock_movements(item_id, movement_date, id)
    WHERE remaining_quantity > 0;
CREATE INDEX idx_stock_movements_origin ON stock_movements(origin_type, origin_id);
";

const FIFO_MAPPINGS_SQL: &str = r"
-- stock_movement_id is NULL for an estimated shortfall draw
CREATE TABLE fifo_mappings (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    origin_type         VARCHAR(40) NOT NULL,
    origin_id           UUID NOT NULL,
    item_id             UUID NOT NULL REFERENCES items(id),
    stock_movement_id   BIGINT REFERENCES stock_movements(id),
    quantity_consumed   NUMERIC(19, 4) NOT NULL,
    unit_cost           NUMERIC(19, 4) NOT NULL,
    total_cost          NUMERIC(19, 4) NOT NULL,
    is_estimated        BOOLEAN NOT NULL DEFAULT false,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_mapping_quantity CHECK (quantity_consumed > 0),
    CONSTRAINT chk_mapping_estimated CHECK (is_estimated OR stock_movement_id IS NOT NULL)
);

CREATE INDEX idx_fifo_mappings_origin ON fifo_mappings(origin_type, origin_id);
";

const JOURNAL_SQL: &str = r"
CREATE TABLE journal_entries (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    journal_number  VARCHAR(32) NOT NULL UNIQUE,
    entry_date      DATE NOT NULL,
    origin_type     VARCHAR(40),
    origin_id       UUID,
    description     TEXT NOT NULL,
    status          journal_status NOT NULL DEFAULT 'posted',
    reversed_by_id  UUID REFERENCES journal_entries(id),
    reverses_id     UUID UNIQUE REFERENCES journal_entries(id),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_reversed_has_pointer CHECK (status <> 'reversed' OR reversed_by_id IS NOT NULL)
);

CREATE INDEX idx_journal_entries_origin ON journal_entries(origin_type, origin_id);
CREATE INDEX idx_journal_entries_date ON journal_entries(entry_date);

CREATE TABLE journal_entry_details (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    journal_entry_id    UUID NOT NULL REFERENCES journal_entries(id),
    account_id          UUID NOT NULL REFERENCES chart_of_accounts(id),
    debit               NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit              NUMERIC(19, 4) NOT NULL DEFAULT 0,
    memo                TEXT,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_detail_non_negative CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_detail_one_side CHECK (NOT (debit > 0 AND credit > 0))
);

CREATE INDEX idx_journal_entry_details_entry ON journal_entry_details(journal_entry_id);
CREATE INDEX idx_journal_entry_details_account ON journal_entry_details(account_id);
";

const CASH_MOVEMENTS_SQL: &str = r"
-- balance is the snapshot after this movement in (movement_date, id) order
CREATE TABLE cash_movements (
    id              BIGSERIAL PRIMARY KEY,
    bank_id         UUID NOT NULL REFERENCES banks(id),
    origin_type     VARCHAR(40) NOT NULL,
    origin_id       UUID NOT NULL,
    movement_date   DATE NOT NULL,
    debit           NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit          NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance         NUMERIC(19, 4) NOT NULL,
    description     TEXT NOT NULL,
    reverses_id     BIGINT UNIQUE REFERENCES cash_movements(id),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_cash_non_negative CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_cash_one_side CHECK ((debit > 0) <> (credit > 0))
);

CREATE INDEX idx_cash_movements_bank_order ON cash_movements(bank_id, movement_date, id);
CREATE INDEX idx_cash_movements_origin ON cash_movements(origin_type, origin_id);
";

const SALES_SQL: &str = r"
CREATE TABLE sales (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    sale_date           DATE NOT NULL,
    settlement          settlement_type NOT NULL,
    bank_id             UUID REFERENCES banks(id),
    tax_rate            NUMERIC(7, 4) NOT NULL DEFAULT 0,
    tax_inclusive       BOOLEAN NOT NULL DEFAULT false,
    subtotal            NUMERIC(19, 4) NOT NULL,
    tax_amount          NUMERIC(19, 4) NOT NULL,
    total               NUMERIC(19, 4) NOT NULL,
    paid_amount         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_sale_cash_bank CHECK (settlement <> 'cash' OR bank_id IS NOT NULL),
    CONSTRAINT chk_sale_paid CHECK (paid_amount >= 0 AND paid_amount <= total)
);

CREATE TABLE sale_details (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_id         UUID NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
    item_id         UUID NOT NULL REFERENCES items(id),
    quantity        NUMERIC(19, 4) NOT NULL,
    unit_price      NUMERIC(19, 4) NOT NULL,
    line_total      NUMERIC(19, 4) NOT NULL,
    cost_total      NUMERIC(19, 4),
    profit          NUMERIC(19, 4),
    profit_status   profit_status,

    CONSTRAINT chk_sale_detail_quantity CHECK (quantity > 0),
    CONSTRAINT chk_sale_detail_price CHECK (unit_price >= 0)
);

CREATE INDEX idx_sale_details_sale ON sale_details(sale_id);
";

const PURCHASES_SQL: &str = r"
CREATE TABLE purchases (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    purchase_date       DATE NOT NULL,
    settlement          settlement_type NOT NULL,
    bank_id             UUID REFERENCES banks(id),
    tax_rate            NUMERIC(7, 4) NOT NULL DEFAULT 0,
    tax_inclusive       BOOLEAN NOT NULL DEFAULT false,
    subtotal            NUMERIC(19, 4) NOT NULL,
    tax_amount          NUMERIC(19, 4) NOT NULL,
    total               NUMERIC(19, 4) NOT NULL,
    paid_amount         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_purchase_cash_bank CHECK (settlement <> 'cash' OR bank_id IS NOT NULL),
    CONSTRAINT chk_purchase_paid CHECK (paid_amount >= 0 AND paid_amount <= total)
);

CREATE TABLE purchase_details (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    purchase_id     UUID NOT NULL REFERENCES purchases(id) ON DELETE CASCADE,
    item_id         UUID NOT NULL REFERENCES items(id),
    quantity        NUMERIC(19, 4) NOT NULL,
    unit_cost       NUMERIC(19, 4) NOT NULL,
    line_total      NUMERIC(19, 4) NOT NULL,

    CONSTRAINT chk_purchase_detail_quantity CHECK (quantity > 0),
    CONSTRAINT chk_purchase_detail_cost CHECK (unit_cost >= 0)
);

CREATE INDEX idx_purchase_details_purchase ON purchase_details(purchase_id);
";

const SALE_RETURNS_SQL: &str = r"
CREATE TABLE sale_returns (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    sale_id             UUID NOT NULL REFERENCES sales(id),
    return_date         DATE NOT NULL,
    settlement          settlement_type NOT NULL,
    bank_id             UUID REFERENCES banks(id),
    tax_rate            NUMERIC(7, 4) NOT NULL DEFAULT 0,
    tax_inclusive       BOOLEAN NOT NULL DEFAULT false,
    subtotal            NUMERIC(19, 4) NOT NULL,
    tax_amount          NUMERIC(19, 4) NOT NULL,
    total               NUMERIC(19, 4) NOT NULL,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_sale_return_cash_bank CHECK (settlement <> 'cash' OR bank_id IS NOT NULL)
);

CREATE INDEX idx_sale_returns_sale ON sale_returns(sale_id);

CREATE TABLE sale_return_details (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_return_id  UUID NOT NULL REFERENCES sale_returns(id) ON DELETE CASCADE,
    sale_detail_id  UUID NOT NULL REFERENCES sale_details(id),
    item_id         UUID NOT NULL REFERENCES items(id),
    quantity        NUMERIC(19, 4) NOT NULL,
    unit_price      NUMERIC(19, 4) NOT NULL,
    line_total      NUMERIC(19, 4) NOT NULL,
    unit_cost       NUMERIC(19, 4),

    CONSTRAINT chk_sale_return_detail_quantity CHECK (quantity > 0)
);

CREATE INDEX idx_sale_return_details_return ON sale_return_details(sale_return_id);
CREATE INDEX idx_sale_return_details_sale_detail ON sale_return_details(sale_detail_id);
";

const PURCHASE_RETURNS_SQL: &str = r"
CREATE TABLE purchase_returns (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    purchase_id         UUID NOT NULL REFERENCES purchases(id),
    return_date         DATE NOT NULL,
    settlement          settlement_type NOT NULL,
    bank_id             UUID REFERENCES banks(id),
    tax_rate            NUMERIC(7, 4) NOT NULL DEFAULT 0,
    tax_inclusive       BOOLEAN NOT NULL DEFAULT false,
    subtotal            NUMERIC(19, 4) NOT NULL,
    tax_amount          NUMERIC(19, 4) NOT NULL,
    total               NUMERIC(19, 4) NOT NULL,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_purchase_return_cash_bank CHECK (settlement <> 'cash' OR bank_id IS NOT NULL)
);

CREATE INDEX idx_purchase_returns_purchase ON purchase_returns(purchase_id);

CREATE TABLE purchase_return_details (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    purchase_return_id  UUID NOT NULL REFERENCES purchase_returns(id) ON DELETE CASCADE,
    purchase_detail_id  UUID NOT NULL REFERENCES purchase_details(id),
    item_id             UUID NOT NULL REFERENCES items(id),
    quantity            NUMERIC(19, 4) NOT NULL,
    unit_price          NUMERIC(19, 4) NOT NULL,
    line_total          NUMERIC(19, 4) NOT NULL,
    cost_total          NUMERIC(19, 4),

    CONSTRAINT chk_purchase_return_detail_quantity CHECK (quantity > 0)
);

CREATE INDEX idx_purchase_return_details_return ON purchase_return_details(purchase_return_id);
";

const CASH_DOCUMENTS_SQL: &str = r"
CREATE TABLE cash_ins (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    transaction_date    DATE NOT NULL,
    bank_id             UUID NOT NULL REFERENCES banks(id),
    account_id          UUID NOT NULL REFERENCES chart_of_accounts(id),
    amount              NUMERIC(19, 4) NOT NULL,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    cash_movement_id    BIGINT REFERENCES cash_movements(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_cash_in_amount CHECK (amount > 0)
);

CREATE TABLE cash_outs (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    transaction_date    DATE NOT NULL,
    bank_id             UUID NOT NULL REFERENCES banks(id),
    account_id          UUID NOT NULL REFERENCES chart_of_accounts(id),
    amount              NUMERIC(19, 4) NOT NULL,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    cash_movement_id    BIGINT REFERENCES cash_movements(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_cash_out_amount CHECK (amount > 0)
);

CREATE TABLE transfers (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    transfer_date       DATE NOT NULL,
    from_bank_id        UUID NOT NULL REFERENCES banks(id),
    to_bank_id          UUID NOT NULL REFERENCES banks(id),
    amount              NUMERIC(19, 4) NOT NULL,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_transfer_amount CHECK (amount > 0),
    CONSTRAINT chk_transfer_banks CHECK (from_bank_id <> to_bank_id)
);
";

const STOCK_ADJUSTMENTS_SQL: &str = r"
CREATE TABLE stock_adjustments (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    adjustment_date     DATE NOT NULL,
    account_id          UUID NOT NULL REFERENCES chart_of_accounts(id),
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE stock_adjustment_details (
    id                      UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    stock_adjustment_id     UUID NOT NULL REFERENCES stock_adjustments(id) ON DELETE CASCADE,
    item_id                 UUID NOT NULL REFERENCES items(id),
    quantity_delta          NUMERIC(19, 4) NOT NULL,
    unit_cost               NUMERIC(19, 4),
    cost_total              NUMERIC(19, 4),

    CONSTRAINT chk_adjustment_delta CHECK (quantity_delta <> 0),
    CONSTRAINT chk_adjustment_increase_cost CHECK (quantity_delta < 0 OR unit_cost IS NOT NULL)
);

CREATE INDEX idx_stock_adjustment_details_adjustment ON stock_adjustment_details(stock_adjustment_id);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    number              VARCHAR(32) NOT NULL UNIQUE,
    payment_date        DATE NOT NULL,
    direction           payment_direction NOT NULL,
    bank_id             UUID NOT NULL REFERENCES banks(id),
    amount              NUMERIC(19, 4) NOT NULL,
    applied_amount      NUMERIC(19, 4) NOT NULL,
    description         TEXT,
    status              document_status NOT NULL DEFAULT 'draft',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_payment_amount CHECK (amount > 0 AND applied_amount >= 0 AND applied_amount <= amount)
);

CREATE TABLE payment_details (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payment_id      UUID NOT NULL REFERENCES payments(id) ON DELETE CASCADE,
    sale_id         UUID REFERENCES sales(id),
    purchase_id     UUID REFERENCES purchases(id),
    amount          NUMERIC(19, 4) NOT NULL,

    CONSTRAINT chk_payment_detail_amount CHECK (amount > 0),
    CONSTRAINT chk_payment_detail_target CHECK ((sale_id IS NULL) <> (purchase_id IS NULL))
);

CREATE INDEX idx_payment_details_payment ON payment_details(payment_id);
CREATE INDEX idx_payment_details_sale ON payment_details(sale_id);
CREATE INDEX idx_payment_details_purchase ON payment_details(purchase_id);

CREATE TABLE overpayments (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payment_id          UUID NOT NULL UNIQUE REFERENCES payments(id),
    amount              NUMERIC(19, 4) NOT NULL,
    status              overpayment_status NOT NULL DEFAULT 'pending',
    journal_entry_id    UUID REFERENCES journal_entries(id),
    cash_movement_id    BIGINT REFERENCES cash_movements(id),
    resolved_at         TIMESTAMPTZ,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_overpayment_amount CHECK (amount > 0)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_journal_detail_mutation
-- Journal lines are append-only; corrections go through a reversing entry
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_journal_detail_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Journal entry details are immutable. Create a reversing entry instead.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_journal_detail_mutation
BEFORE UPDATE OR DELETE ON journal_entry_details
FOR EACH ROW
EXECUTE FUNCTION prevent_journal_detail_mutation();

-- ============================================================
-- FUNCTION: prevent_cash_movement_mutation
-- Only the balance snapshot of a cash movement may change
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_cash_movement_mutation()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        RAISE EXCEPTION 'Cash movements cannot be deleted. Create a reversing movement instead.';
    END IF;

    IF NEW.debit <> OLD.debit
        OR NEW.credit <> OLD.credit
        OR NEW.bank_id <> OLD.bank_id
        OR NEW.movement_date <> OLD.movement_date THEN
        RAISE EXCEPTION 'Cash movement amounts are immutable.';
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_cash_movement_mutation
BEFORE UPDATE OR DELETE ON cash_movements
FOR EACH ROW
EXECUTE FUNCTION prevent_cash_movement_mutation();
";

const DROP_ALL_SQL: &str = r"
-- Drop triggers
DROP TRIGGER IF EXISTS trg_prevent_cash_movement_mutation ON cash_movements;
DROP TRIGGER IF EXISTS trg_prevent_journal_detail_mutation ON journal_entry_details;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_cash_movement_mutation();
DROP FUNCTION IF EXISTS prevent_journal_detail_mutation();

-- Drop tables (reverse order)
DROP TABLE IF EXISTS overpayments CASCADE;
DROP TABLE IF EXISTS payment_details CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS stock_adjustment_details CASCADE;
DROP TABLE IF EXISTS stock_adjustments CASCADE;
DROP TABLE IF EXISTS transfers CASCADE;
DROP TABLE IF EXISTS cash_outs CASCADE;
DROP TABLE IF EXISTS cash_ins CASCADE;
DROP TABLE IF EXISTS purchase_return_details CASCADE;
DROP TABLE IF EXISTS purchase_returns CASCADE;
DROP TABLE IF EXISTS sale_return_details CASCADE;
DROP TABLE IF EXISTS sale_returns CASCADE;
DROP TABLE IF EXISTS purchase_details CASCADE;
DROP TABLE IF EXISTS purchases CASCADE;
DROP TABLE IF EXISTS sale_details CASCADE;
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS cash_movements CASCADE;
DROP TABLE IF EXISTS journal_entry_details CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS fifo_mappings CASCADE;
DROP TABLE IF EXISTS stock_movements CASCADE;
DROP TABLE IF EXISTS banks CASCADE;
DROP TABLE IF EXISTS chart_of_accounts CASCADE;
DROP TABLE IF EXISTS items CASCADE;

-- Drop enums
DROP TYPE IF EXISTS bank_type;
DROP TYPE IF EXISTS profit_status;
DROP TYPE IF EXISTS overpayment_status;
DROP TYPE IF EXISTS payment_direction;
DROP TYPE IF EXISTS settlement_type;
DROP TYPE IF EXISTS document_status;
DROP TYPE IF EXISTS journal_status;
DROP TYPE IF EXISTS account_type;
";
