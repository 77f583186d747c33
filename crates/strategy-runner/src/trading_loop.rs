//! Trading loop - connect, poll, decide, submit.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use auth::ApiToken;
use common::ExponentialBackoff;
use connector_core::Transport;
use connector_deriv::{
    AuthError, FetchError, MarketDataFetcher, OrderSubmitter, Session, SubmitError,
};
use metrics::SharedMetrics;
use model::OrderResult;
use strategy_core::{BoxedDecisionEngine, Signal};

use crate::config::TradingConfig;
use crate::error::RunnerError;

/// Jitter applied to reconnect delays, as a fraction of the delay.
const RECONNECT_JITTER: f64 = 0.1;

/// Lifecycle of the trading loop, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, not yet running.
    Idle,
    /// Connecting and authorizing, possibly after a backoff.
    Connecting,
    /// Authenticated and running poll cycles.
    Polling,
    /// Shutdown requested; closing the connection.
    ShuttingDown,
    /// Stopped on a terminal error.
    Failed,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Polling => write!(f, "polling"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Candles fetched and decided on; an order was sent if the signal asked
    /// for one.
    Completed { signal: Signal },
    /// Something other than the connection failed; try again next interval.
    Skipped,
    /// The connection dropped. `order_sent` is set when a purchase may have
    /// reached the venue before the drop.
    ConnectionLost { order_sent: bool },
}

enum ConnectOutcome {
    Ready,
    Shutdown,
    Failed(RunnerError),
}

enum PollOutcome {
    Shutdown,
    ConnectionLost { order_sent: bool },
}

/// Drives one session: fetch candles, decide, submit, sleep, repeat.
///
/// Reconnects with exponential backoff when the connection drops and stops
/// for good only on shutdown, token rejection, or an exhausted reconnect
/// budget.
pub struct TradingLoop<T> {
    config: TradingConfig,
    session: Arc<Session<T>>,
    fetcher: MarketDataFetcher<T>,
    submitter: OrderSubmitter<T>,
    engine: BoxedDecisionEngine,
    metrics: SharedMetrics,
    state_tx: watch::Sender<LoopState>,
}

impl<T: Transport> TradingLoop<T> {
    pub fn new(
        config: TradingConfig,
        transport: T,
        token: ApiToken,
        engine: BoxedDecisionEngine,
        metrics: SharedMetrics,
    ) -> Self {
        let session = Arc::new(
            Session::new(transport, token).with_request_timeout(config.request_timeout),
        );
        let (state_tx, _) = watch::channel(LoopState::Idle);

        Self {
            fetcher: MarketDataFetcher::new(session.clone()),
            submitter: OrderSubmitter::new(session.clone()),
            session,
            config,
            engine,
            metrics,
            state_tx,
        }
    }

    /// Receiver for state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> LoopState {
        *self.state_tx.borrow()
    }

    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    fn set_state(&self, state: LoopState) {
        self.state_tx.send_replace(state);
        debug!(state = %state, "Trading loop state changed");
    }

    /// Run until shutdown is signaled or a terminal error occurs.
    ///
    /// The shutdown flag is checked before every cycle and interrupts any
    /// sleep. A request already in flight is allowed to finish.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), RunnerError> {
        if let Err(e) = self.config.validate() {
            self.set_state(LoopState::Failed);
            return Err(e.into());
        }

        info!(
            symbol = %self.config.symbol,
            stake = %self.config.stake,
            currency = %self.config.currency,
            engine = self.engine.name(),
            poll_interval_secs = self.config.poll_interval.as_secs_f64(),
            "Starting trading loop"
        );

        let mut backoff = ExponentialBackoff::new(
            self.config.reconnect_base_delay,
            self.config.reconnect_max_delay,
            RECONNECT_JITTER,
        )
        .with_max_attempts(self.config.max_reconnect_attempts);

        let mut reconnecting = false;
        let mut delay_first_cycle = false;

        loop {
            self.set_state(LoopState::Connecting);
            match self.connect(&mut backoff, &mut shutdown_rx, reconnecting).await {
                ConnectOutcome::Ready => {}
                ConnectOutcome::Shutdown => break,
                ConnectOutcome::Failed(e) => {
                    self.set_state(LoopState::Failed);
                    self.session.close().await;
                    return Err(e);
                }
            }
            reconnecting = true;

            self.set_state(LoopState::Polling);
            match self.poll(&mut backoff, &mut shutdown_rx, delay_first_cycle).await {
                PollOutcome::Shutdown => break,
                PollOutcome::ConnectionLost { order_sent } => {
                    delay_first_cycle = order_sent;
                    self.set_state(LoopState::Connecting);

                    // Not reset until a cycle finishes on the new connection
                    let Some(delay) = backoff.next_delay() else {
                        let attempts = backoff.attempt();
                        error!(attempts, "Connection keeps dropping, giving up");
                        self.set_state(LoopState::Failed);
                        self.session.close().await;
                        return Err(RunnerError::ReconnectExhausted {
                            attempts,
                            last_error: "connection lost during poll cycle".to_string(),
                        });
                    };

                    warn!(
                        order_sent,
                        attempt = backoff.attempt(),
                        delay_secs = delay.as_secs_f64(),
                        "Connection lost, abandoning cycle"
                    );

                    if !sleep_or_shutdown(delay, &mut shutdown_rx).await {
                        info!("Shutdown requested during backoff");
                        break;
                    }
                }
            }
        }

        self.set_state(LoopState::ShuttingDown);
        self.session.close().await;
        info!("Trading loop stopped");
        Ok(())
    }

    /// Establish an authenticated session, retrying with backoff.
    ///
    /// Success does not reset `backoff`; that waits for a finished cycle.
    async fn connect(
        &self,
        backoff: &mut ExponentialBackoff,
        shutdown_rx: &mut watch::Receiver<bool>,
        mut is_reconnect: bool,
    ) -> ConnectOutcome {
        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown requested before connecting");
                return ConnectOutcome::Shutdown;
            }

            if is_reconnect {
                self.metrics.inc_reconnect_attempts();
            }

            match self.session.establish().await {
                Ok(_) => {
                    if is_reconnect {
                        self.metrics.inc_reconnect_successes();
                        info!("Reconnected and re-authorized");
                    }
                    return ConnectOutcome::Ready;
                }
                Err(AuthError::Rejected { code, message }) => {
                    error!(code = %code, message = %message, "Token rejected, not retrying");
                    return ConnectOutcome::Failed(RunnerError::AuthRejected { code, message });
                }
                Err(e) => {
                    let Some(delay) = backoff.next_delay() else {
                        let attempts = backoff.attempt();
                        error!(error = %e, attempts, "Reconnect attempts exhausted");
                        return ConnectOutcome::Failed(RunnerError::ReconnectExhausted {
                            attempts,
                            last_error: e.to_string(),
                        });
                    };

                    warn!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_secs = delay.as_secs_f64(),
                        "Connection failed, retrying"
                    );

                    if !sleep_or_shutdown(delay, shutdown_rx).await {
                        info!("Shutdown requested during backoff");
                        return ConnectOutcome::Shutdown;
                    }
                    is_reconnect = true;
                }
            }
        }
    }

    /// Run cycles until shutdown or connection loss.
    ///
    /// The first cycle to finish on this connection resets `backoff`.
    async fn poll(
        &self,
        backoff: &mut ExponentialBackoff,
        shutdown_rx: &mut watch::Receiver<bool>,
        mut wait_first: bool,
    ) -> PollOutcome {
        loop {
            if wait_first {
                // A purchase may have landed just before the drop
                debug!("Waiting a full interval before the first cycle");
                if !sleep_or_shutdown(self.config.poll_interval, shutdown_rx).await {
                    return PollOutcome::Shutdown;
                }
                wait_first = false;
            }

            if *shutdown_rx.borrow() {
                info!("Shutdown signal received");
                return PollOutcome::Shutdown;
            }

            if let CycleOutcome::ConnectionLost { order_sent } = self.run_cycle().await {
                return PollOutcome::ConnectionLost { order_sent };
            }
            if backoff.attempt() > 0 {
                debug!(attempts = backoff.attempt(), "Connection stable, resetting backoff");
                backoff.reset();
            }

            if !sleep_or_shutdown(self.config.poll_interval, shutdown_rx).await {
                info!("Shutdown signal received");
                return PollOutcome::Shutdown;
            }
        }
    }

    /// Fetch candles, decide, and submit at most one order.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let series = match self
            .fetcher
            .fetch_candles(
                &self.config.symbol,
                self.config.candle_count,
                self.config.granularity_secs,
            )
            .await
        {
            Ok(series) => series,
            Err(e) => {
                self.metrics.inc_cycles_skipped();
                if let FetchError::Session(session_err) = &e {
                    if session_err.needs_reconnect() {
                        warn!(error = %e, "Skipping cycle, connection lost");
                        return CycleOutcome::ConnectionLost { order_sent: false };
                    }
                    if session_err.is_timeout() {
                        self.metrics.inc_request_timeouts();
                    }
                }
                warn!(symbol = %self.config.symbol, error = %e, "Skipping cycle");
                return CycleOutcome::Skipped;
            }
        };

        let signal = self.engine.decide(&series);
        info!(
            symbol = %self.config.symbol,
            candles = series.len(),
            last_close = ?series.last_close(),
            signal = %signal,
            "Decision"
        );

        let Some(direction) = signal.direction() else {
            self.metrics.inc_cycles_completed();
            return CycleOutcome::Completed { signal };
        };

        let order = self.config.order_request(direction);
        match self.submitter.submit(&order).await {
            Ok(result) => {
                self.metrics.inc_orders_submitted();
                match result {
                    OrderResult::Accepted { .. } => self.metrics.inc_orders_accepted(),
                    OrderResult::Rejected { .. } => self.metrics.inc_orders_rejected(),
                    OrderResult::TransportFailure { reason } => {
                        self.metrics.inc_order_transport_failures();
                        if !self.session.is_authenticated() {
                            return CycleOutcome::ConnectionLost { order_sent: true };
                        }
                        self.metrics.inc_request_timeouts();
                        warn!(reason = %reason, "Order outcome unknown, not resubmitting");
                    }
                }
            }
            Err(SubmitError::InvalidRequest(e)) => {
                error!(error = %e, "Order failed validation, not sent");
            }
            Err(SubmitError::Session(e)) if e.needs_reconnect() => {
                warn!(error = %e, "Order not sent, connection lost");
                return CycleOutcome::ConnectionLost { order_sent: false };
            }
            Err(e) => {
                // The venue answered, so the order most likely went through
                self.metrics.inc_orders_submitted();
                self.metrics.inc_order_transport_failures();
                warn!(error = %e, "Could not decode purchase response");
            }
        }

        self.metrics.inc_cycles_completed();
        CycleOutcome::Completed { signal }
    }
}

/// Sleep for `duration` unless shutdown is signaled first.
///
/// Returns `false` if shutdown was requested. A dropped sender can never
/// signal shutdown, so the sleep then runs to completion.
async fn sleep_or_shutdown(duration: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    if *shutdown_rx.borrow() {
        return false;
    }

    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    (&mut sleep).await;
                    return true;
                }
                if *shutdown_rx.borrow() {
                    return false;
                }
            }

            _ = &mut sleep => return true,
        }
    }
}
