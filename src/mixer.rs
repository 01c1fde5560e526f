//! AudioMixer - Per-track gain cache driven by synchronizer notifications
//!
//! For every audio track the mixer keeps the effective `(volume, muted)`
//! pair the local viewer should hear:
//!
//! ```text
//! volume = track.volume * member.volume * (customGroup | group).volume [* balance]
//! muted  = track.muted  || member.muted || (customGroup | group).muted
//! ```
//!
//! Each notification is reduced to the set of stale tracks, which is then
//! recomputed in one pass. Reads go to a concurrent map and never block the
//! synchronizer; a read may lag the latest event by one message.

mod cascade;
mod gain;

pub use cascade::{affected, resolve, Affected};
pub use gain::{apply, balance, Gain, Sample};

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::signal::{Signal, Subscription};
use crate::store::Store;
use crate::sync::{Notification, Synchronizer};

/// A cached gain was (re)computed
#[derive(Debug, Clone, PartialEq)]
pub struct GainChanged {
    pub track_id: String,
    pub gain: Gain,
}

pub struct AudioMixer {
    store: Arc<Store>,
    use_balance: bool,
    gains: DashMap<String, Gain>,
    gain_changed: Signal<GainChanged>,
    subscription: Mutex<Option<Subscription>>,
}

impl AudioMixer {
    /// Create a detached mixer; feed it with [`AudioMixer::on_notification`]
    pub fn new(store: Arc<Store>, use_balance: bool) -> Arc<Self> {
        Arc::new(Self {
            store,
            use_balance,
            gains: DashMap::new(),
            gain_changed: Signal::new(),
            subscription: Mutex::new(None),
        })
    }

    /// Create a mixer listening to `sync`
    ///
    /// The subscription holds the mixer weakly; dropping the last `Arc`
    /// stops it.
    pub fn attach(sync: &Synchronizer, use_balance: bool) -> Arc<Self> {
        let mixer = Self::new(Arc::clone(sync.store()), use_balance);
        let weak: Weak<AudioMixer> = Arc::downgrade(&mixer);

        let subscription = sync.notifications().connect(move |notification| {
            if let Some(mixer) = weak.upgrade() {
                mixer.on_notification(notification);
            }
        });
        *mixer.subscription.lock() = Some(subscription);

        // Pick up whatever is already replicated
        if sync.store().is_ready() {
            mixer.recompute_all();
        }
        mixer
    }

    /// Stop listening; cached gains stay readable
    pub fn detach(&self) {
        self.subscription.lock().take();
    }

    pub fn uses_balance(&self) -> bool {
        self.use_balance
    }

    /// Fires after every recompute
    pub fn gain_changed(&self) -> &Signal<GainChanged> {
        &self.gain_changed
    }

    /// Cached gain of a track, `None` if unknown
    pub fn gain(&self, track_id: &str) -> Option<Gain> {
        self.gains.get(track_id).map(|entry| *entry.value())
    }

    /// Number of cached tracks
    pub fn len(&self) -> usize {
        self.gains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    /// Scale a buffer for `track_id`; unknown tracks pass through unchanged
    pub fn apply_gain<S: Sample>(&self, track_id: &str, samples: &mut [S]) {
        if let Some(gain) = self.gain(track_id) {
            apply(gain, samples);
        }
    }

    /// Scale one sample for `track_id`
    pub fn apply_gain_sample<S: Sample>(&self, track_id: &str, sample: S) -> S {
        match self.gain(track_id) {
            Some(gain) => sample.scale(gain.factor()),
            None => sample,
        }
    }

    /// React to one synchronizer notification
    pub fn on_notification(&self, notification: &Notification) {
        match affected(&self.store, notification, self.use_balance) {
            Affected::Nothing => {}
            Affected::All => self.recompute_all(),
            Affected::Tracks(ids) => self.recompute(&ids),
            Affected::Evict(id) => {
                if self.gains.remove(&id).is_some() {
                    trace!(track = %id, "Gain evicted");
                }
            }
            Affected::Clear => {
                let count = self.gains.len();
                self.gains.clear();
                debug!(count, "Gain cache cleared");
            }
        }
    }

    /// Recompute every replicated track
    pub fn recompute_all(&self) {
        let ids: BTreeSet<String> = self
            .store
            .audio_tracks
            .get_all()
            .into_iter()
            .map(|track| track.id)
            .collect();
        // Drop entries whose track vanished without a removal
        self.gains.retain(|id, _| ids.contains(id));
        debug!(tracks = ids.len(), "Recomputing all gains");
        self.recompute(&ids);
    }

    fn recompute(&self, ids: &BTreeSet<String>) {
        for id in ids {
            let Some(track) = self.store.audio_tracks.get(id) else {
                self.gains.remove(id);
                continue;
            };
            let gain = resolve(&self.store, &track, self.use_balance);
            self.gains.insert(id.clone(), gain);
            self.gain_changed.emit(GainChanged {
                track_id: id.clone(),
                gain,
            });
        }
    }
}

#[cfg(test)]
mod tests;
