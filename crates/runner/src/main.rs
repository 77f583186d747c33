use auth::ApiToken;
use clap::error::ErrorKind;
use clap::Parser;
use common::ApiEndpoint;
use connector_deriv::WsTransport;
use metrics::create_metrics;
use model::{ContractBasis, DurationUnit};
use rust_decimal::Decimal;
use std::process::ExitCode;
use std::time::Duration;
use strategy_core::ParityDecision;
use strategy_runner::{RunnerError, TradingConfig, TradingLoop};
use tokio::sync::watch;
use tracing::{error, info};

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

const EXIT_CONFIG: u8 = 1;
const EXIT_AUTH_REJECTED: u8 = 2;
const EXIT_RECONNECT_EXHAUSTED: u8 = 3;

/// Poll candles, decide, and buy one contract per cycle.
///
/// The API token is read from `DERIV_API_TOKEN` (or a `.env` file).
#[derive(Debug, Parser)]
#[command(name = "trader", version, about)]
struct Args {
    /// API endpoint as `host` or `host:app_id` [default: DERIV_WS_HOST / DERIV_APP_ID]
    #[arg(long)]
    endpoint: Option<ApiEndpoint>,

    /// Instrument to trade
    #[arg(long, env = "TRADER_SYMBOL", default_value = "R_100")]
    symbol: String,

    /// Stake per contract
    #[arg(long, env = "TRADER_STAKE", default_value = "10")]
    stake: Decimal,

    #[arg(long, env = "TRADER_CURRENCY", default_value = "USD")]
    currency: String,

    /// Contract duration, in `duration-unit`
    #[arg(long, env = "TRADER_DURATION", default_value_t = 1)]
    duration: u32,

    /// One of t, s, m, h, d
    #[arg(long, env = "TRADER_DURATION_UNIT", default_value = "m", value_parser = parse_duration_unit)]
    duration_unit: DurationUnit,

    /// Seconds between poll cycles
    #[arg(long, env = "TRADER_POLL_INTERVAL_SECS", default_value_t = 60)]
    poll_interval_secs: u64,

    /// Candles requested per cycle
    #[arg(long, env = "TRADER_CANDLE_COUNT", default_value_t = 50)]
    candle_count: u32,

    /// Candle width in seconds
    #[arg(long, env = "TRADER_GRANULARITY_SECS", default_value_t = 60)]
    granularity_secs: u32,

    /// Consecutive failed reconnects before giving up
    #[arg(long, env = "TRADER_MAX_RECONNECT_ATTEMPTS", default_value_t = 5)]
    max_reconnect_attempts: u32,

    /// Seconds to wait for any single response
    #[arg(long, env = "TRADER_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    request_timeout_secs: u64,
}

impl Args {
    fn trading_config(&self) -> TradingConfig {
        TradingConfig {
            symbol: self.symbol.clone(),
            stake: self.stake,
            currency: self.currency.clone(),
            basis: ContractBasis::Stake,
            duration: self.duration,
            duration_unit: self.duration_unit,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            candle_count: self.candle_count,
            granularity_secs: self.granularity_secs,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_reconnect_attempts: self.max_reconnect_attempts,
            ..TradingConfig::default()
        }
    }
}

fn parse_duration_unit(s: &str) -> Result<DurationUnit, String> {
    DurationUnit::from_api_str(s.trim())
        .ok_or_else(|| format!("unknown duration unit '{}', expected one of t, s, m, h, d", s))
}

fn exit_code(err: &RunnerError) -> u8 {
    match err {
        RunnerError::InvalidConfig(_) => EXIT_CONFIG,
        RunnerError::AuthRejected { .. } => EXIT_AUTH_REJECTED,
        RunnerError::ReconnectExhausted { .. } => EXIT_RECONNECT_EXHAUSTED,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so env fallbacks see it
    dotenvy::dotenv().ok();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_CONFIG),
            };
        }
    };

    common::init_logging();

    let token = match ApiToken::from_env() {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "API token unavailable");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let config = args.trading_config();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::from(EXIT_CONFIG);
    }

    let endpoint = args.endpoint.clone().unwrap_or_else(ApiEndpoint::from_env);

    info!(
        endpoint = %endpoint,
        symbol = %config.symbol,
        stake = %config.stake,
        currency = %config.currency,
        token = %token.masked(),
        "Starting trader"
    );

    // Create metrics
    let metrics = create_metrics(config.poll_interval);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let trading_loop = TradingLoop::new(
        config,
        WsTransport::new(endpoint.ws_url()),
        token,
        Box::new(ParityDecision),
        metrics.clone(),
    );

    // Spawn ctrl_c handler
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx_clone.send(true);
        }
    });

    // Spawn periodic health reporter
    let health_metrics = metrics.clone();
    let mut health_shutdown_rx = shutdown_tx.subscribe();
    let mut state_rx = trading_loop.subscribe_state();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = health_metrics.snapshot();
                    let status = snapshot.health_status();
                    let state = *state_rx.borrow_and_update();
                    info!(
                        status = %status,
                        state = %state,
                        cycles = snapshot.cycles_completed,
                        skipped = snapshot.cycles_skipped,
                        orders = snapshot.orders_submitted,
                        timeouts = snapshot.request_timeouts,
                        reconnects = snapshot.reconnect_attempts,
                        "Health check"
                    );
                }
                _ = health_shutdown_rx.changed() => {
                    if *health_shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let result = trading_loop.run(shutdown_rx).await;

    // Stop the health reporter
    let _ = shutdown_tx.send(true);

    // Print final metrics
    let snapshot = metrics.snapshot();
    println!("\n{}", snapshot);

    match result {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Trader stopped");
            ExitCode::from(exit_code(&e))
        }
    }
}
