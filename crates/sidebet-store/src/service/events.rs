//! Change feed events.

/// Which collection changed. Listeners refetch the snapshot they care about
/// rather than reconstructing state from event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Bets,
    Groups,
    Friendships,
    Settlements,
    Notifications,
}
