use pigment_base::hashing::{HashMap, HashSet};
use pigment_base::{AggregateProgress, AssetKey, AssetKind, ProgressSample};

pub type AggregateProgressCallback = Box<dyn FnMut(AggregateProgress) + Send>;

//
// Combines the progress of every asset in a loading session into one event.
//
// Assets report cumulative loaded/total counters whenever their transport makes progress. We keep
// the latest counters per asset and sum them. The sum is only meaningful once every asset we are
// waiting on has told us its length; until then a total that only covers some of the assets would
// make the bar jump backwards when the rest arrive, so we report "indeterminate" instead.
//
// Every asset is marked pending when its load starts, and stops being pending on its first report.
// A kind that the session declared it has no assets of does not gate the result at all.
//
pub struct ProgressAggregator {
    on_progress: AggregateProgressCallback,

    // Latest counters for each asset whose length is known
    samples: HashMap<AssetKey, ProgressSample>,

    has_buffers: bool,
    has_textures: bool,
    buffers_pending_first_update: HashSet<AssetKey>,
    textures_pending_first_update: HashSet<AssetKey>,

    // The last event we emitted
    aggregate: AggregateProgress,
}

impl ProgressAggregator {
    pub fn new<F>(on_progress: F) -> Self
    where
        F: FnMut(AggregateProgress) + Send + 'static,
    {
        ProgressAggregator {
            on_progress: Box::new(on_progress),
            samples: Default::default(),
            has_buffers: true,
            has_textures: true,
            buffers_pending_first_update: Default::default(),
            textures_pending_first_update: Default::default(),
            aggregate: AggregateProgress::INDETERMINATE,
        }
    }

    /// Declares that the session will not load anything of this kind, so the kind never holds back
    /// the aggregate from being computable. This only ever turns a kind off.
    pub fn declare_no_assets_of_kind(
        &mut self,
        kind: AssetKind,
    ) {
        log::debug!("declare_no_assets_of_kind {}", kind);
        match kind {
            AssetKind::Buffer => self.has_buffers = false,
            AssetKind::Texture => self.has_textures = false,
        }
    }

    /// Records that a load for `key` has started and no progress has been seen for it yet. Must be
    /// called before the transport can report anything for the key. Adding the same key twice is a
    /// no-op.
    pub fn mark_pending_first_update(
        &mut self,
        kind: AssetKind,
        key: &AssetKey,
    ) {
        let other_kind = match kind {
            AssetKind::Buffer => AssetKind::Texture,
            AssetKind::Texture => AssetKind::Buffer,
        };

        if self.pending_set(other_kind).contains(key) {
            log::warn!(
                "{:?} is already pending as a {}, ignoring request to mark it pending as a {}",
                key,
                other_kind,
                kind
            );
            return;
        }

        if self.pending_set_mut(kind).insert(key.clone()) {
            log::trace!("{:?} pending first update ({})", key, kind);
        }
    }

    /// Records the latest cumulative counters for `key` and emits the new aggregate, which is also
    /// returned. A zero `total` means the length is unknown: the asset stops being pending but any
    /// earlier sample for it is left as it was.
    pub fn report_progress(
        &mut self,
        key: &AssetKey,
        kind: AssetKind,
        loaded: u64,
        total: u64,
    ) -> AggregateProgress {
        if self.pending_set_mut(kind).remove(key) {
            log::trace!("{:?} received first update ({})", key, kind);
        }

        if total != 0 {
            let loaded = if loaded > total {
                log::warn!(
                    "{:?} reported {} bytes loaded out of {}, clamping",
                    key,
                    loaded,
                    total
                );
                total
            } else {
                loaded
            };

            self.samples
                .insert(key.clone(), ProgressSample { total, loaded });
        }

        self.aggregate = self.compute_aggregate();
        (self.on_progress)(self.aggregate);
        self.aggregate
    }

    fn compute_aggregate(&self) -> AggregateProgress {
        // Totals come from servers, saturate instead of overflowing. loaded <= total per sample, so
        // the sums keep loaded <= total.
        let mut total: u64 = 0;
        let mut loaded: u64 = 0;
        for sample in self.samples.values() {
            total = total.saturating_add(sample.total);
            loaded = loaded.saturating_add(sample.loaded);
        }

        let length_computable = total != 0
            && (!self.has_buffers || self.buffers_pending_first_update.is_empty())
            && (!self.has_textures || self.textures_pending_first_update.is_empty());

        if length_computable {
            AggregateProgress::new(loaded, total)
        } else {
            AggregateProgress::INDETERMINATE
        }
    }

    /// The most recently emitted aggregate
    pub fn aggregate(&self) -> AggregateProgress {
        self.aggregate
    }

    pub fn sample(
        &self,
        key: &AssetKey,
    ) -> Option<ProgressSample> {
        self.samples.get(key).copied()
    }

    pub fn is_pending(
        &self,
        kind: AssetKind,
        key: &AssetKey,
    ) -> bool {
        self.pending_set(kind).contains(key)
    }

    pub fn pending_count(
        &self,
        kind: AssetKind,
    ) -> usize {
        self.pending_set(kind).len()
    }

    pub fn has_assets_of_kind(
        &self,
        kind: AssetKind,
    ) -> bool {
        match kind {
            AssetKind::Buffer => self.has_buffers,
            AssetKind::Texture => self.has_textures,
        }
    }

    fn pending_set(
        &self,
        kind: AssetKind,
    ) -> &HashSet<AssetKey> {
        match kind {
            AssetKind::Buffer => &self.buffers_pending_first_update,
            AssetKind::Texture => &self.textures_pending_first_update,
        }
    }

    fn pending_set_mut(
        &mut self,
        kind: AssetKind,
    ) -> &mut HashSet<AssetKey> {
        match kind {
            AssetKind::Buffer => &mut self.buffers_pending_first_update,
            AssetKind::Texture => &mut self.textures_pending_first_update,
        }
    }
}
