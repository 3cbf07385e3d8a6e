use crate::fault::Fault;

/// Execution-state machine for the emulator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Paused between runs; the debugger may resume execution.
    #[default]
    Stopped,
    /// Inside an execution run.
    Running,
    /// The guest executed the trap instruction.
    End {
        /// Address of the trap instruction.
        pc: u32,
        /// Value of `a0` when the trap executed.
        code: u32,
    },
    /// A fault aborted execution.
    Abort {
        /// Fault that aborted the run.
        fault: Fault,
    },
    /// The user left the debugger.
    Quit,
}

impl RunState {
    /// Returns `true` once the program can no longer be resumed.
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::End { .. } | Self::Abort { .. })
    }

    /// Returns the latched fault, if this state is an abort.
    #[must_use]
    pub const fn fault(self) -> Option<Fault> {
        match self {
            Self::Abort { fault } => Some(fault),
            Self::Stopped | Self::Running | Self::End { .. } | Self::Quit => None,
        }
    }

    /// Maps the final state to a process exit status: only a good trap or a
    /// user quit count as success.
    #[must_use]
    pub const fn is_bad_exit(self) -> bool {
        match self {
            Self::End { code, .. } => code != 0,
            Self::Quit => false,
            Self::Stopped | Self::Running | Self::Abort { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RunState;
    use crate::fault::Fault;

    #[test]
    fn run_state_default_is_stopped() {
        assert_eq!(RunState::default(), RunState::Stopped);
    }

    #[test]
    fn fault_accessor_reports_only_abort_variant() {
        let fault = Fault::IllegalInstruction { pc: 4, raw: 0 };
        assert_eq!(RunState::Running.fault(), None);
        assert_eq!(RunState::End { pc: 0, code: 0 }.fault(), None);
        assert_eq!(RunState::Abort { fault }.fault(), Some(fault));
    }

    #[test]
    fn exit_status_follows_trap_code() {
        assert!(!RunState::End { pc: 0, code: 0 }.is_bad_exit());
        assert!(RunState::End { pc: 0, code: 1 }.is_bad_exit());
        assert!(!RunState::Quit.is_bad_exit());
        assert!(RunState::Stopped.is_bad_exit());
        assert!(RunState::Abort {
            fault: Fault::IllegalInstruction { pc: 0, raw: 0 }
        }
        .is_bad_exit());
    }

    #[test]
    fn only_end_and_abort_are_terminal() {
        assert!(RunState::End { pc: 0, code: 3 }.is_terminated());
        assert!(RunState::Abort {
            fault: Fault::IllegalInstruction { pc: 0, raw: 0 }
        }
        .is_terminated());
        assert!(!RunState::Stopped.is_terminated());
        assert!(!RunState::Quit.is_terminated());
    }
}
