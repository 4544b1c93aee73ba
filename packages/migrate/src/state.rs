/// Where the driver is in a migration pass.
///
/// ```text
/// Idle -> Opening -> Iterating <-> Decoding -> {Skipping | Transforming} -> Iterating
///                    Iterating -> Closing -> Done
/// Opening | Iterating | Closing -> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationState {
    #[default]
    Idle,
    Opening,
    Iterating,
    Decoding,
    Skipping,
    Transforming,
    Closing,
    Done,
    Aborted,
}

impl MigrationState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_enter(self, next: MigrationState) -> bool {
        use MigrationState::*;

        matches!(
            (self, next),
            (Idle | Done | Aborted, Opening)
                | (Opening, Iterating)
                | (Opening, Aborted)
                | (Iterating, Decoding)
                | (Iterating, Closing)
                | (Iterating, Aborted)
                | (Decoding, Skipping)
                | (Decoding, Transforming)
                | (Skipping | Transforming, Iterating)
                | (Closing, Done)
                | (Closing, Aborted)
        )
    }
}
