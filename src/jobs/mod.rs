pub mod payment_sweep_sync;
pub mod yield_settlement_sync;
