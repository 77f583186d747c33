//! Domain types shared by the connector, the decision engines, and the runner.

mod candle;
mod order;

pub use candle::{Candle, CandleSeries, SeriesError};
pub use order::{
    ContractBasis, ContractDirection, DurationUnit, OrderRequest, OrderResult,
    OrderValidationError,
};
