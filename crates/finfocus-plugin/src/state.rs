use serde::Serialize;

/// Plugin lifecycle (§4.4). Only forward transitions are valid; `Failed` is
/// reachable from any non-terminal state. `Closed` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PluginState {
    Discovered,
    Spawning,
    Handshaking,
    Ready,
    /// `Ready`, but `GetPluginInfo` returned `Unimplemented`: spec version is
    /// unknown and the plugin is tagged `Legacy` in any listing.
    Legacy,
    Closing,
    Closed,
    Failed,
}

impl PluginState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PluginState::Closed | PluginState::Failed)
    }

    pub fn is_usable(self) -> bool {
        matches!(self, PluginState::Ready | PluginState::Legacy)
    }

    fn rank(self) -> u8 {
        match self {
            PluginState::Discovered => 0,
            PluginState::Spawning => 1,
            PluginState::Handshaking => 2,
            PluginState::Ready | PluginState::Legacy => 3,
            PluginState::Closing => 4,
            PluginState::Closed | PluginState::Failed => 5,
        }
    }

    /// `true` if moving from `self` to `next` is a legal forward transition.
    /// `Failed` is reachable from anywhere non-terminal; `Ready`/`Legacy` are
    /// mutually exclusive alternatives at the same lifecycle point.
    pub fn can_transition_to(self, next: PluginState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == PluginState::Failed {
            return true;
        }
        next.rank() >= self.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(PluginState::Discovered.can_transition_to(PluginState::Spawning));
        assert!(PluginState::Handshaking.can_transition_to(PluginState::Ready));
        assert!(PluginState::Handshaking.can_transition_to(PluginState::Legacy));
        assert!(PluginState::Ready.can_transition_to(PluginState::Closing));
        assert!(PluginState::Closing.can_transition_to(PluginState::Closed));
    }

    #[test]
    fn backward_transitions_are_rejected() {
        assert!(!PluginState::Ready.can_transition_to(PluginState::Spawning));
        assert!(!PluginState::Closed.can_transition_to(PluginState::Ready));
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        assert!(PluginState::Spawning.can_transition_to(PluginState::Failed));
        assert!(PluginState::Ready.can_transition_to(PluginState::Failed));
        assert!(!PluginState::Failed.can_transition_to(PluginState::Ready));
    }
}
