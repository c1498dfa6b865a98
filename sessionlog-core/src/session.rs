// Copyright 2025 Sessionlog (https://github.com/sessionlog)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Session lifecycle state machine and agent-session numbering.
//!
//! A session begins in `Started` (no events yet), becomes `Active` with its
//! first event, and ends with a `session_end` event or a process exit
//! (`TerminatedWithoutEnd`). A `context_reset` keeps the session active and
//! increments the agent session number. The machine replays a recorded
//! session from its first line, so the store can flag lifecycle violations
//! on append without ever rejecting the write.

use crate::event::EventKind;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Started,
    Active,
    Ended,
    TerminatedWithoutEnd,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ended | SessionState::TerminatedWithoutEnd)
    }
}

#[derive(Debug, Error)]
#[error("Invalid transition: {current:?} -> {kind:?}")]
pub struct InvalidTransition {
    pub current: SessionState,
    pub kind: EventKind,
}

impl SessionState {
    /// Advance the lifecycle by one appended event.
    ///
    /// A repeated `session_start` is invalid, `context_reset` never ends
    /// the session, and terminal states accept nothing further.
    pub fn transition(self, kind: EventKind) -> Result<SessionState, InvalidTransition> {
        use SessionState::*;

        let next = match (self, kind) {
            (Started, EventKind::SessionEnd) => Ended,
            (Started, _) => Active,
            (Active, EventKind::SessionStart) => {
                return Err(InvalidTransition { current: self, kind })
            }
            (Active, EventKind::SessionEnd) => Ended,
            (Active, _) => Active,
            _ => return Err(InvalidTransition { current: self, kind }),
        };

        Ok(next)
    }

    /// Replay a recorded event stream from the initial state, skipping any
    /// invalid step the way the append path does.
    pub fn replay<'a>(kinds: impl IntoIterator<Item = &'a EventKind>) -> SessionState {
        let mut state = SessionState::Started;
        for kind in kinds {
            if let Ok(next) = state.transition(*kind) {
                state = next;
            }
        }
        state
    }
}

/// Derive the agent session number for the next record of a session.
///
/// Counts the context-reset markers already present in the session's record
/// stream and adds one; the first segment is 1. A reset record itself
/// carries the number of the segment it terminates.
pub fn agent_session_number<'a>(prior_kinds: impl IntoIterator<Item = &'a EventKind>) -> u32 {
    let resets = prior_kinds
        .into_iter()
        .filter(|k| **k == EventKind::ContextReset)
        .count() as u32;
    resets + 1
}
