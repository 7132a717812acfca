/// Position in the per-player interaction cycle.
///
/// Exactly one value is active per actor; each `advance()` call performs one
/// transition. The cycle is observe -> decide -> (counterfactual) ->
/// post-observe -> (trajectory flush), then back to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Build and submit the observation request. Emits no move.
    ObserveBeforeAct,
    /// Consume the reply and derive a concrete move (or a no-op off turn).
    DecideMove,
    /// Advance a private state clone under a hypothesized move.
    FictitiousAct,
    /// Post-move bookkeeping; branches on game termination.
    ObserveAfterAct,
    /// End-of-episode flush; returns to the top of the cycle.
    StoreTrajectory,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::ObserveBeforeAct => "observe_before_act",
            Stage::DecideMove => "decide_move",
            Stage::FictitiousAct => "fictitious_act",
            Stage::ObserveAfterAct => "observe_after_act",
            Stage::StoreTrajectory => "store_trajectory",
        }
    }
}
