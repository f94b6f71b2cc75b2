/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound, shake and persistence.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    JumpStarted,
    /// A jump slammed into a wall.
    CameraShake { magnitude: f64, duration: u32 },
    FallStarted,
    SlipStarted,
    /// Fell or slid back onto climbable ground.
    Landed,
    Drowned { falling: bool },
    Finished { ticks: u64 },
    /// Death fade done: the Over screen takes over.
    Died,
    /// Win fade done.
    Won,
    /// A stats record was beaten and needs saving.
    NewRecord,
}
