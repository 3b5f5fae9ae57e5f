//! Table-driven state machine for the sync module's three modes.
//!
//! ```text
//!   StateId      on_enter            on_exit             on_update
//!   Idle         -                   -                   idle_update
//!   Provisioning queue AP start      queue AP stop       provisioning_update
//!   Syncing      reset clock, join   stop fetch, leave   poll join / fetch
//! ```
//!
//! Handlers never touch collaborators.  They read `ctx.inputs` and push
//! [`context::RadioAction`]s, which the service applies in order after the
//! handler returns, so an exit's teardown always lands before the next
//! enter's setup.
//!
//! Exactly one state is current, so Provisioning and Syncing can never be
//! active together.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

/// Device mode.  Doubles as the index into the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Provisioning = 1,
    Syncing = 2,
}

impl StateId {
    pub const COUNT: usize = 3;
    pub const ALL: [StateId; Self::COUNT] = [Self::Idle, Self::Provisioning, Self::Syncing];
}

/// Runs once on entering or leaving a state.
pub type StateActionFn = fn(&mut FsmContext);

/// Runs every tick; `Some(next)` requests a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

/// One row of the state table.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

pub struct Fsm {
    /// Row `i` describes `StateId::ALL[i]`.
    table: [StateDescriptor; StateId::COUNT],
    current: StateId,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial,
        }
    }

    /// Enter the initial state.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        let row = self.row(self.current);
        info!("FSM starting in state: {}", row.name);
        if let Some(enter) = row.on_enter {
            enter(ctx);
        }
    }

    /// Run the current state's update and follow any transition it asks for.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        ctx.ticks_in_state = ctx.ticks_in_state.wrapping_add(1);
        if let Some(next) = (self.row(self.current).on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Command-driven transition.  A no-op when `next` is already current.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next != self.current {
            self.transition(next, ctx);
        }
    }

    /// Run `on_exit` then `on_enter` for the current state.
    pub fn reenter(&mut self, ctx: &mut FsmContext) {
        self.transition(self.current, ctx);
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn current_name(&self) -> &'static str {
        self.row(self.current).name
    }

    fn row(&self, id: StateId) -> &StateDescriptor {
        &self.table[id as usize]
    }

    fn transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        debug_assert_eq!(self.row(next).id, next, "state table out of order");
        info!(
            "FSM transition: {} -> {}",
            self.row(self.current).name,
            self.row(next).name
        );

        if let Some(exit) = self.row(self.current).on_exit {
            exit(ctx);
        }
        self.current = next;
        ctx.ticks_in_state = 0;
        if let Some(enter) = self.row(next).on_enter {
            enter(ctx);
        }
    }
}
