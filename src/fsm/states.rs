//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers, no closures, no dynamic
//! dispatch, no heap.  Handlers never touch a collaborator themselves;
//! they queue [`RadioAction`]s on the context.
//!
//! ```text
//!            EnableProvisioning(true)
//!   IDLE ───────────────────────────────▶ PROVISIONING
//!    ▲ ◀─────────────────────────────────     │
//!    │       EnableProvisioning(false)        │ PollTime
//!    │                                        ▼
//!    └──[success | timeout | cancel]──── SYNCING ◀── PollTime (from Idle)
//! ```
//!
//! Command-driven edges are taken by the service; the only edge a handler
//! takes on its own is Syncing → Idle when the session completes.

use log::{info, warn};

use super::context::{FsmContext, RadioAction, SyncCompletion, SyncSession};
use super::{StateDescriptor, StateId};
use crate::timezone;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: StateId::Provisioning,
            name: "Provisioning",
            on_enter: Some(provisioning_enter),
            on_exit: Some(provisioning_exit),
            on_update: provisioning_update,
        },
        StateDescriptor {
            id: StateId::Syncing,
            name: "Syncing",
            on_enter: Some(syncing_enter),
            on_exit: Some(syncing_exit),
            on_update: syncing_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(_ctx: &mut FsmContext) {
    info!("IDLE: radio off, waiting for host");
}

fn idle_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROVISIONING state: access point and request server up
// ═══════════════════════════════════════════════════════════════════════════

fn provisioning_enter(ctx: &mut FsmContext) {
    ctx.push_action(RadioAction::StartAccessPoint);
    info!("PROVISIONING: access point requested");
}

fn provisioning_exit(ctx: &mut FsmContext) {
    ctx.push_action(RadioAction::StopAccessPoint);
}

/// Submissions are consumed by the service, which owns the store.
fn provisioning_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SYNCING state: join and fetch, give up at the deadline
// ═══════════════════════════════════════════════════════════════════════════

fn syncing_enter(ctx: &mut FsmContext) {
    // A fresh session must prove itself against a cleared clock.
    ctx.push_action(RadioAction::ResetClock);
    ctx.time_valid_until = None;
    ctx.push_action(RadioAction::StartJoin);

    let request = ctx.request;
    ctx.session = Some(SyncSession {
        started_at: ctx.inputs.uptime_secs,
        timeout_secs: request.timeout_secs,
        validity_secs: request.validity_secs,
        joined_this_session: false,
        fetch_started: false,
    });
    info!(
        "SYNCING: joining '{}' (timeout {}s, validity {}s)",
        ctx.settings.ssid, request.timeout_secs, request.validity_secs
    );
}

fn syncing_exit(ctx: &mut FsmContext) {
    ctx.push_action(RadioAction::StopTimeFetch);
    ctx.push_action(RadioAction::StopJoin);
    if let Some(session) = ctx.session.take() {
        info!(
            "SYNCING: session closed after {}s ({} ticks)",
            session.elapsed_secs(ctx.inputs.uptime_secs),
            ctx.ticks_in_state
        );
    }
}

fn syncing_update(ctx: &mut FsmContext) -> Option<StateId> {
    let Some(mut session) = ctx.session else {
        warn!("SYNCING: no session, returning to Idle");
        return Some(StateId::Idle);
    };
    let inputs = ctx.inputs;

    if inputs.joined && !session.joined_this_session {
        session.joined_this_session = true;
        info!("SYNCING: joined after {}s", session.elapsed_secs(inputs.uptime_secs));
    }
    if session.joined_this_session && !session.fetch_started && !inputs.fetch_running {
        ctx.push_action(RadioAction::StartTimeFetch);
        session.fetch_started = true;
    }
    ctx.session = Some(session);

    if inputs.now_utc > ctx.config.known_valid_epoch {
        let local = timezone::project(inputs.now_utc, ctx.settings.timezone);
        ctx.feedback.record_sync_success();
        ctx.time_valid_until = Some(inputs.uptime_secs + u64::from(session.validity_secs));
        ctx.completion = Some(SyncCompletion::Succeeded {
            local,
            valid_for_secs: session.validity_secs,
        });
        return Some(StateId::Idle);
    }

    if session.elapsed_secs(inputs.uptime_secs) > u64::from(session.timeout_secs) {
        ctx.feedback.record_sync_timeout(session.joined_this_session);
        ctx.completion = Some(SyncCompletion::TimedOut {
            joined: session.joined_this_session,
        });
        return Some(StateId::Idle);
    }

    None
}
