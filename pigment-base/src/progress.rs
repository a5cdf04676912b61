/// One cumulative progress notification from a transport. `total` is zero while the length of the
/// resource is unknown (for example a response without a Content-Length).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressTick {
    pub loaded: u64,
    pub total: u64,
}

impl ProgressTick {
    pub fn new(
        loaded: u64,
        total: u64,
    ) -> Self {
        ProgressTick { loaded, total }
    }
}

/// The most recent counters recorded for a single asset. Only stored once the total is known.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressSample {
    pub total: u64,
    pub loaded: u64,
}

/// Combined progress across every asset of a session. When `length_computable` is false, `loaded`
/// and `total` are both zero and the consumer should show an indeterminate indicator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateProgress {
    pub length_computable: bool,
    pub loaded: u64,
    pub total: u64,
}

impl AggregateProgress {
    pub const INDETERMINATE: AggregateProgress = AggregateProgress {
        length_computable: false,
        loaded: 0,
        total: 0,
    };

    pub fn new(
        loaded: u64,
        total: u64,
    ) -> Self {
        AggregateProgress {
            length_computable: true,
            loaded,
            total,
        }
    }

    /// Fraction in `0.0..=1.0`, or `None` while indeterminate
    pub fn fraction(&self) -> Option<f32> {
        if self.length_computable && self.total > 0 {
            Some(self.loaded as f32 / self.total as f32)
        } else {
            None
        }
    }
}
