//! Cancel-on-disconnect acceptor simulation
//!
//! This example drives a framer the way a FIX acceptor's session layer would:
//! - Each counterparty runs as its own task and reports logon, logout and
//!   transport events through a cloned `FramerHandle`
//! - CoD settings are decoded from the tag 35002/35003 fields of the logon
//! - The timeout handler runs on the framer thread and forwards cancel
//!   requests to an async order gateway over a channel
//!
//! Three counterparties are simulated:
//! - `FIRM_A` drops its connection and never comes back, so its orders are cancelled
//! - `FIRM_B` logs out and reconnects inside the window, so nothing fires
//! - `FIRM_C` never asks for cancel-on-disconnect
//!
//! Set `COD_WINDOW_MS` and `COD_TICK_MS` to change the timing.

use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::{self, JoinSet};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use ironcod_core::{
    CancelOnDisconnectCustomisation, CancelOnDisconnectType, CodSettings, CompId, CompositeKey,
    NoSessionCustomisation, SessionCustomisationStrategy, SurrogateSessionId,
};
use ironcod_engine::{
    CancelOnDisconnectTimeoutHandler, FramerBuilder, FramerHandle, HandlerError, HandlerResult,
};

use ironcod_example::{ExampleConfig, init_logging};

/// Cancel request handed to the order gateway.
#[derive(Debug, Clone)]
struct CancelRequest {
    session_id: SurrogateSessionId,
    key: CompositeKey,
}

/// Timeout handler that forwards mass-cancel requests to the gateway task.
struct OrderCanceller {
    gateway: mpsc::UnboundedSender<CancelRequest>,
}

impl CancelOnDisconnectTimeoutHandler for OrderCanceller {
    fn on_cancel_on_disconnect_timeout(
        &mut self,
        session_id: SurrogateSessionId,
        fix_session_key: &CompositeKey,
    ) -> HandlerResult {
        warn!(%session_id, key = %fix_session_key, "cod window elapsed, cancelling orders");
        self.gateway
            .send(CancelRequest {
                session_id,
                key: fix_session_key.clone(),
            })
            .map_err(|_| HandlerError::new("order gateway is gone"))
    }
}

/// How a simulated counterparty behaves after logging on.
#[derive(Debug, Clone, Copy)]
enum Script {
    DropForever,
    LogoutAndReturn,
    PlainSession,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::acceptor();
    info!(
        window_ms = cfg.cod_window.as_millis() as u64,
        tick_ms = cfg.tick_interval.as_millis() as u64,
        "starting cancel on disconnect acceptor"
    );

    let (gateway_tx, mut gateway_rx) = mpsc::unbounded_channel();
    let framer = FramerBuilder::new()
        .with_handler(OrderCanceller {
            gateway: gateway_tx,
        })
        .with_tick_interval(cfg.tick_interval)
        .with_max_cod_window(Duration::from_secs(60))
        .spawn()?;

    let mut sessions = JoinSet::new();
    for (remote, script) in [
        ("FIRM_A", Script::DropForever),
        ("FIRM_B", Script::LogoutAndReturn),
        ("FIRM_C", Script::PlainSession),
    ] {
        let key = CompositeKey::new(cfg.local_comp_id.parse()?, remote.parse::<CompId>()?);
        sessions.spawn(counterparty(framer.handle(), key, script, cfg.clone()));
    }
    while let Some(result) = sessions.join_next().await {
        result??;
    }

    let wait = cfg.cod_window * 2;
    loop {
        match timeout(wait, gateway_rx.recv()).await {
            Ok(Some(request)) => {
                info!(
                    session_id = %request.session_id,
                    key = %request.key,
                    "order gateway cancelled all resting orders"
                );
            }
            Ok(None) | Err(_) => break,
        }
    }

    let control = task::spawn_blocking(move || framer.shutdown()).await??;
    let stats = control.stats().snapshot();
    info!(
        sessions = control.registry().len(),
        armed = stats.timers_armed,
        cancelled = stats.timers_cancelled,
        delivered = stats.timeouts_delivered,
        failures = stats.handler_failures,
        "framer stopped"
    );
    Ok(())
}

/// Plays one counterparty's connection lifecycle against the framer.
async fn counterparty(
    handle: FramerHandle,
    key: CompositeKey,
    script: Script,
    cfg: ExampleConfig,
) -> anyhow::Result<()> {
    let settings = logon(&key, script, cfg.cod_window)?;

    let register_handle = handle.clone();
    let register_key = key.clone();
    let session_id = task::spawn_blocking(move || register_handle.register(register_key))
        .await?
        .with_context(|| format!("register {key}"))?;
    handle.logon_accepted(session_id, settings)?;
    info!(%session_id, %key, %settings, "logon accepted");

    sleep(cfg.cod_window / 4).await;

    match script {
        Script::DropForever => {
            info!(%session_id, "transport dropped");
            handle.transport_disconnected(session_id)?;
        }
        Script::LogoutAndReturn => {
            info!(%session_id, "logout received");
            handle.logout_received(session_id)?;
            handle.transport_disconnected(session_id)?;

            sleep(cfg.cod_window / 2).await;
            let renewed = logon(&key, script, cfg.cod_window)?;
            let reconnect_handle = handle.clone();
            let reconnect_key = key.clone();
            let id = task::spawn_blocking(move || {
                reconnect_handle.reconnected(reconnect_key, renewed)
            })
            .await??;
            info!(session_id = %id, "reconnected inside the window");
        }
        Script::PlainSession => {
            info!(%session_id, "transport dropped");
            handle.transport_disconnected(session_id)?;
        }
    }
    Ok(())
}

/// Builds the counterparty's logon fields and decodes them as the acceptor would.
fn logon(key: &CompositeKey, script: Script, window: Duration) -> anyhow::Result<CodSettings> {
    let mut fields = vec![(98, "0".to_string()), (108, "30".to_string())];
    match script {
        Script::DropForever => CancelOnDisconnectCustomisation::new(CodSettings::new(
            CancelOnDisconnectType::CancelOnDisconnect,
            window,
        ))
        .configure_logon(&mut fields, key),
        Script::LogoutAndReturn => CancelOnDisconnectCustomisation::new(CodSettings::new(
            CancelOnDisconnectType::CancelOnEither,
            window,
        ))
        .configure_logon(&mut fields, key),
        Script::PlainSession => NoSessionCustomisation.configure_logon(&mut fields, key),
    }

    let settings = CodSettings::from_logon_fields(
        fields
            .iter()
            .map(|(tag, value)| (*tag, value.as_bytes())),
    )?;
    Ok(settings)
}
