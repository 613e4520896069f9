use crate::resolver::SupersedePolicy;
use crate::ResolvedPreview;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// Lifecycle of the unit owning a preview.
///
/// `Inactive -> Active -> TornDown`, each transition at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Inactive,
    Active,
    TornDown,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Inactive,
            1 => Lifecycle::Active,
            _ => Lifecycle::TornDown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Lifecycle::Inactive => 0,
            Lifecycle::Active => 1,
            Lifecycle::TornDown => 2,
        }
    }
}

/// Gate in front of the shared [`ResolvedPreview`].
///
/// Writes land only while the owner is [`Lifecycle::Active`]. Lifecycle
/// transitions and writes all go through the watch channel's write lock, so a
/// write racing a teardown is either applied before it or dropped.
pub struct LifecycleGuard {
    state: watch::Sender<ResolvedPreview>,
    phase: AtomicU8,
    latest: AtomicU64,
    policy: SupersedePolicy,
}

impl LifecycleGuard {
    pub fn new(policy: SupersedePolicy) -> Self {
        let (state, _) = watch::channel(ResolvedPreview::empty());
        Self {
            state,
            phase: AtomicU8::new(Lifecycle::Inactive.as_u8()),
            latest: AtomicU64::new(0),
            policy,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Opens the gate. Returns false if the guard was already activated or torn down.
    pub fn activate(&self) -> bool {
        let mut activated = false;
        self.state.send_if_modified(|_| {
            activated = self
                .phase
                .compare_exchange(
                    Lifecycle::Inactive.as_u8(),
                    Lifecycle::Active.as_u8(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok();
            false
        });
        if activated {
            debug!("Preview lifecycle activated");
        }
        activated
    }

    /// Closes the gate for good. Returns false if it was already torn down.
    pub fn teardown(&self) -> bool {
        let mut previous = Lifecycle::TornDown;
        self.state.send_if_modified(|_| {
            previous = Lifecycle::from_u8(
                self.phase
                    .swap(Lifecycle::TornDown.as_u8(), Ordering::AcqRel),
            );
            false
        });
        if previous != Lifecycle::TornDown {
            debug!(previous = ?previous, "Preview lifecycle torn down");
        }
        previous != Lifecycle::TornDown
    }

    /// Issues the sequence number for a new resolution attempt.
    pub fn next_sequence(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn latest_sequence(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Replaces the shared state with `next` if the gate allows it.
    ///
    /// Dropped writes are expected and only logged at debug level.
    pub fn write(&self, seq: u64, next: ResolvedPreview) -> bool {
        self.state.send_if_modified(|current| {
            let phase = self.lifecycle();
            if phase != Lifecycle::Active {
                debug!(seq, phase = ?phase, "Dropping preview write outside active lifecycle");
                return false;
            }
            if self.policy == SupersedePolicy::LatestRequest {
                let latest = self.latest.load(Ordering::Acquire);
                if seq != latest {
                    debug!(seq, latest, "Dropping preview write from superseded attempt");
                    return false;
                }
            }
            *current = next;
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolvedPreview> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ResolvedPreview {
        self.state.borrow().clone()
    }
}
