pub(super) const CREATE_TRADING_RESULTS: &str = r"
CREATE TABLE IF NOT EXISTS trading_results (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    exchange_product_id   TEXT NOT NULL,
    exchange_product_name TEXT NOT NULL,
    oil_id                TEXT NOT NULL,
    delivery_basis_id     TEXT NOT NULL,
    delivery_basis_name   TEXT NOT NULL,
    delivery_type_id      TEXT NOT NULL,
    volume                TEXT,
    total                 TEXT,
    count                 INTEGER NOT NULL,
    trade_date            TEXT NOT NULL,
    created_at            TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at            TEXT NOT NULL DEFAULT (datetime('now')),
    CONSTRAINT unique_trade_record UNIQUE (exchange_product_id, trade_date)
)
";

pub(super) const CREATE_TRADE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_trading_results_trade_date
    ON trading_results (trade_date)
";
