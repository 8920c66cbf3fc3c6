//! Table-driven finite state machine engine.
//!
//! Classic embedded FSM pattern: a static transition table plus a hook
//! table of plain function pointers, indexed by state.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  TransitionRule table                          │
//! │  ┌─────────┬──────────────┬──────────┐         │
//! │  │ trigger │ source       │ dest     │         │
//! │  ├─────────┼──────────────┼──────────┤         │
//! │  │ none    │ *            │ None     │         │
//! │  │ call    │ *            │ Call     │         │
//! │  │ video   │ *            │ Video    │         │
//! │  │ request │ Video        │ Request  │         │
//! │  │ request │ Coffee       │ None     │         │
//! │  │ coffee  │ None         │ Coffee   │         │
//! │  └─────────┴──────────────┴──────────┘         │
//! │                                                │
//! │  StateHooks table: on_enter / on_exit per state│
//! └───────────────────────────────────────────────┘
//! ```
//!
//! [`Fsm::fire`] resolves a trigger against the current state.  On a match
//! it runs, strictly in order: `on_exit(old)` → state update →
//! `after_change(new)` → `on_enter(new)`.  On no match nothing runs.
//! Every hook receives the caller's context `C`, which holds whatever the
//! hooks need to act on.

pub mod context;
pub mod states;

use core::fmt;
use core::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, TransitionError};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state the light can be in.
/// Must stay in sync with the hook table built in [`states::build_hook_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum State {
    None = 0,
    Call = 1,
    Video = 2,
    Request = 3,
    /// Away / do-not-disturb.
    Coffee = 4,
}

impl State {
    /// Total number of states, used to size the hook table.
    pub const COUNT: usize = 5;

    pub const ALL: [State; State::COUNT] = [
        State::None,
        State::Call,
        State::Video,
        State::Request,
        State::Coffee,
    ];

    /// Lowercase name, as reported to the HTTP layer and to peers.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Call => "call",
            Self::Video => "video",
            Self::Request => "request",
            Self::Coffee => "coffee",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parse a lowercase (or mixed-case) state name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Named requests to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    None,
    Call,
    Video,
    Request,
    Coffee,
}

impl Trigger {
    pub const ALL: [Trigger; 5] = [
        Trigger::None,
        Trigger::Call,
        Trigger::Video,
        Trigger::Request,
        Trigger::Coffee,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Call => "call",
            Self::Video => "video",
            Self::Request => "request",
            Self::Coffee => "coffee",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trigger {
    type Err = TransitionError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TransitionError::UnknownTrigger(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Allowed source states of a rule.
#[derive(Debug, Clone, Copy)]
pub enum Sources {
    /// Wildcard: matches every state.
    Any,
    Only(&'static [State]),
}

impl Sources {
    pub fn contains(&self, state: State) -> bool {
        match self {
            Self::Any => true,
            Self::Only(set) => set.contains(&state),
        }
    }
}

/// One `(trigger, allowed sources, destination)` row.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub trigger: Trigger,
    pub source: Sources,
    pub dest: State,
}

/// The canonical transition table.
///
/// `request` is deliberately asymmetric: from `Video` it rings the bell,
/// from `Coffee` it cancels away mode.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        trigger: Trigger::None,
        source: Sources::Any,
        dest: State::None,
    },
    TransitionRule {
        trigger: Trigger::Call,
        source: Sources::Any,
        dest: State::Call,
    },
    TransitionRule {
        trigger: Trigger::Video,
        source: Sources::Any,
        dest: State::Video,
    },
    TransitionRule {
        trigger: Trigger::Request,
        source: Sources::Only(&[State::Video]),
        dest: State::Request,
    },
    TransitionRule {
        trigger: Trigger::Request,
        source: Sources::Only(&[State::Coffee]),
        dest: State::None,
    },
    TransitionRule {
        trigger: Trigger::Coffee,
        source: Sources::Only(&[State::None]),
        dest: State::Coffee,
    },
];

/// Look up the destination for `trigger` fired from `current`.
pub fn resolve(table: &[TransitionRule], trigger: Trigger, current: State) -> Option<State> {
    table
        .iter()
        .find(|rule| rule.trigger == trigger && rule.source.contains(current))
        .map(|rule| rule.dest)
}

/// Startup validation of a transition table.
///
/// Rejects empty source sets, triggers with no rule at all, and any
/// `(trigger, state)` pair matched by more than one rule.
pub fn validate_table(table: &[TransitionRule]) -> Result<()> {
    if table
        .iter()
        .any(|rule| matches!(rule.source, Sources::Only(set) if set.is_empty()))
    {
        return Err(Error::InvalidTable("rule with empty source set"));
    }

    for trigger in Trigger::ALL {
        if !table.iter().any(|rule| rule.trigger == trigger) {
            return Err(Error::InvalidTable("trigger without any rule"));
        }
        for state in State::ALL {
            let matches = table
                .iter()
                .filter(|rule| rule.trigger == trigger && rule.source.contains(state))
                .count();
            if matches > 1 {
                return Err(Error::InvalidTable("ambiguous rules for trigger and source"));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Signature for enter, exit and after-change hooks.  The `State` argument
/// is the state being left (exit) or entered (enter, after-change).
pub type StateActionFn<C> = fn(&mut C, State);

/// Optional enter/exit hooks for one state.  Stored in a fixed array
/// indexed by `State as usize`.
pub struct StateHooks<C> {
    pub state: State,
    pub on_enter: Option<StateActionFn<C>>,
    pub on_exit: Option<StateActionFn<C>>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The state machine: transition table, hook table, current state.
pub struct Fsm<C> {
    table: &'static [TransitionRule],
    hooks: [StateHooks<C>; State::COUNT],
    after_change: StateActionFn<C>,
    current: State,
    /// Successful transitions since construction.
    total_transitions: u64,
}

impl<C> Fsm<C> {
    /// Build and validate an FSM starting in `initial`.
    pub fn new(
        table: &'static [TransitionRule],
        hooks: [StateHooks<C>; State::COUNT],
        after_change: StateActionFn<C>,
        initial: State,
    ) -> Result<Self> {
        validate_table(table)?;
        if hooks
            .iter()
            .enumerate()
            .any(|(i, h)| h.state.index() != i)
        {
            return Err(Error::InvalidTable("hook table out of order"));
        }
        Ok(Self {
            table,
            hooks,
            after_change,
            current: initial,
            total_transitions: 0,
        })
    }

    /// Apply the initial state's after-change and enter hooks.
    /// Call once after construction.
    pub fn start(&mut self, ctx: &mut C) {
        info!("state machine starting in '{}'", self.current);
        (self.after_change)(ctx, self.current);
        if let Some(enter) = self.hooks[self.current.index()].on_enter {
            enter(ctx, self.current);
        }
    }

    /// Fire `trigger`.  Returns `(from, to)` on success; on rejection the
    /// state is unchanged and no hook runs.
    pub fn fire(
        &mut self,
        trigger: Trigger,
        ctx: &mut C,
    ) -> core::result::Result<(State, State), TransitionError> {
        let from = self.current;
        let Some(to) = resolve(self.table, trigger, from) else {
            debug!("trigger '{}' rejected in '{}'", trigger, from);
            return Err(TransitionError::NotAllowed { trigger, from });
        };

        info!("state: {} -> {} (trigger '{}')", from, to, trigger);

        if let Some(exit) = self.hooks[from.index()].on_exit {
            exit(ctx, from);
        }

        self.current = to;
        self.total_transitions += 1;

        (self.after_change)(ctx, to);

        if let Some(enter) = self.hooks[to.index()].on_enter {
            enter(ctx, to);
        }

        Ok((from, to))
    }

    pub fn current_state(&self) -> State {
        self.current
    }

    pub fn total_transitions(&self) -> u64 {
        self.total_transitions
    }
}
