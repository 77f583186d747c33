//! Contract purchase.

use crate::error::{SessionError, SubmitError};
use crate::protocol::{api_error, buy_request, BuyRaw};
use crate::session::Session;
use connector_core::Transport;
use model::{OrderRequest, OrderResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct OrderSubmitter<T> {
    session: Arc<Session<T>>,
}

impl<T: Transport> OrderSubmitter<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self { session }
    }

    /// Validate and submit a purchase.
    ///
    /// Once the request has been written, a timeout or dropped connection
    /// yields `OrderResult::TransportFailure`: the venue may have filled the
    /// order, so it must not be resent.
    pub async fn submit(&self, order: &OrderRequest) -> Result<OrderResult, SubmitError> {
        order.validate()?;

        let response = match self.session.request(buy_request(order)).await {
            Ok(response) => response,
            Err(SessionError::NotAuthenticated) => {
                return Err(SessionError::NotAuthenticated.into());
            }
            Err(e) => {
                warn!(
                    symbol = %order.symbol,
                    direction = order.direction.as_api_str(),
                    error = %e,
                    "Order outcome unknown"
                );
                return Ok(OrderResult::TransportFailure {
                    reason: e.to_string(),
                });
            }
        };

        let result = decode_buy(&response)?;
        match &result {
            OrderResult::Accepted {
                contract_id,
                buy_price,
                ..
            } => info!(
                symbol = %order.symbol,
                direction = order.direction.as_api_str(),
                contract_id,
                buy_price = ?buy_price,
                "Contract purchased"
            ),
            OrderResult::Rejected { code, reason } => info!(
                symbol = %order.symbol,
                direction = order.direction.as_api_str(),
                code = code.as_deref().unwrap_or("unknown"),
                reason = %reason,
                "Purchase rejected"
            ),
            OrderResult::TransportFailure { .. } => {}
        }
        Ok(result)
    }
}

/// Decode a `buy` response into an accepted or rejected result.
pub fn decode_buy(response: &Value) -> Result<OrderResult, SubmitError> {
    if let Some(err) = api_error(response) {
        return Ok(OrderResult::Rejected {
            code: Some(err.code),
            reason: err.message,
        });
    }

    let raw = response
        .get("buy")
        .ok_or_else(|| SubmitError::Malformed("response has no buy field".into()))?;
    let buy: BuyRaw =
        serde_json::from_value(raw.clone()).map_err(|e| SubmitError::Malformed(e.to_string()))?;

    if let Some(longcode) = &buy.longcode {
        debug!(contract_id = buy.contract_id, longcode = %longcode, "Contract details");
    }

    Ok(OrderResult::Accepted {
        contract_id: buy.contract_id,
        transaction_id: buy.transaction_id,
        buy_price: buy.buy_price,
    })
}
