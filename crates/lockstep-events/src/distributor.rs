use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::{Event, EventError, EventListener, HostEventSource, ListenerId};

/// Listener usable from the producer thread.
pub type ImmediateListener<E> = Arc<dyn EventListener<E> + Send + Sync>;

/// Listener owned by the emulation thread.
pub type DeferredListener<E> = Rc<dyn EventListener<E>>;

/// Copy-on-write listener list. Dispatch clones the `Arc` and iterates without holding the
/// registry lock, so registration from another thread (or from a listener) never blocks it.
type Snapshot<T> = Arc<[(ListenerId, T)]>;

struct Shared<E: Event> {
    immediate: Mutex<HashMap<E::Kind, Snapshot<ImmediateListener<E>>>>,
    deferred: Mutex<HashMap<E::Kind, Snapshot<()>>>,
    queue: Mutex<VecDeque<(E, ListenerId)>>,
    next_id: AtomicU64,
}

impl<E: Event> Shared<E> {
    /// Queues one delivery per deferred listener of `kind`.
    ///
    /// The registry lock is held while pushing (lock order: registry, then queue), so a
    /// listener that `unregister_deferred_listener` has already removed never gets a pair
    /// queued after its retirement bookkeeping ran.
    fn enqueue_deferred(&self, kind: &E::Kind, event: &E) -> usize {
        let registry = lock(&self.deferred);
        let Some(ids) = registry.get(kind) else {
            return 0;
        };
        let mut queue = lock(&self.queue);
        for (id, ()) in ids.iter() {
            queue.push_back((event.clone(), *id));
        }
        ids.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A listener panicking on another thread must not wedge event delivery.
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn with_added<T: Clone>(list: Option<&Snapshot<T>>, id: ListenerId, item: T) -> Snapshot<T> {
    let mut items: Vec<(ListenerId, T)> = list.map(|l| l.to_vec()).unwrap_or_default();
    items.push((id, item));
    items.into()
}

fn remove_from<K, T>(map: &mut HashMap<K, Snapshot<T>>, kind: K, id: ListenerId) -> bool
where
    K: Eq + std::hash::Hash,
    T: Clone,
{
    let Some(list) = map.get(&kind) else {
        return false;
    };
    if !list.iter().any(|(lid, _)| *lid == id) {
        return false;
    }
    let remaining: Vec<(ListenerId, T)> = list
        .iter()
        .filter(|(lid, _)| *lid != id)
        .cloned()
        .collect();
    if remaining.is_empty() {
        map.remove(&kind);
    } else {
        map.insert(kind, remaining.into());
    }
    true
}

/// Producer-side half of the host event pipeline.
///
/// Cloneable and thread-safe. The producer thread calls [`EventDistributor::distribute`]
/// (usually via [`EventDistributor::spawn_producer`]) for every host event: immediate
/// listeners run right there, deferred deliveries are queued for the emulation thread's
/// [`DeferredEvents::drain_deferred`].
pub struct EventDistributor<E: Event> {
    shared: Arc<Shared<E>>,
}

impl<E: Event> Clone for EventDistributor<E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Consumer-side half of the host event pipeline. Lives on the emulation thread.
pub struct DeferredEvents<E: Event> {
    shared: Arc<Shared<E>>,
    listeners: RefCell<HashMap<ListenerId, DeferredListener<E>>>,
    /// Unregistered listeners that still have deliveries queued.
    retired: RefCell<HashMap<ListenerId, DeferredListener<E>>>,
}

impl<E: Event> EventDistributor<E> {
    /// Creates the connected producer and consumer halves.
    pub fn new() -> (Self, DeferredEvents<E>) {
        let shared = Arc::new(Shared {
            immediate: Mutex::new(HashMap::new()),
            deferred: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(0),
        });
        let consumer = DeferredEvents {
            shared: shared.clone(),
            listeners: RefCell::new(HashMap::new()),
            retired: RefCell::new(HashMap::new()),
        };
        (Self { shared }, consumer)
    }

    /// Registers a listener invoked on the producer thread as soon as an event of `kind`
    /// arrives. Such listeners must not touch emulated state.
    pub fn register_immediate_listener(
        &self,
        kind: E::Kind,
        listener: ImmediateListener<E>,
    ) -> ListenerId {
        let id = ListenerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let mut map = lock(&self.shared.immediate);
        let updated = with_added(map.get(&kind), id, listener);
        map.insert(kind, updated);
        id
    }

    /// Returns whether the listener was registered.
    pub fn unregister_immediate_listener(&self, kind: E::Kind, id: ListenerId) -> bool {
        remove_from(&mut lock(&self.shared.immediate), kind, id)
    }

    /// Delivers one host event: immediate listeners inline, deferred listeners queued.
    ///
    /// Returns the number of deferred deliveries queued.
    pub fn distribute(&self, event: E) -> usize {
        let kind = event.kind();

        let immediate = lock(&self.shared.immediate).get(&kind).cloned();
        if let Some(listeners) = immediate {
            for (_, listener) in listeners.iter() {
                listener.signal_event(&event);
            }
        }

        self.shared.enqueue_deferred(&kind, &event)
    }

    /// Number of queued deferred deliveries.
    pub fn pending_deferred(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Runs the producer loop on the calling thread until the source closes.
    ///
    /// A source failure is returned as [`EventError::Source`]; callers must treat it as
    /// fatal since no further host input can arrive.
    pub fn run_producer<S: HostEventSource<E>>(&self, mut source: S) -> Result<(), EventError> {
        loop {
            match source.wait_event() {
                Ok(Some(event)) => {
                    tracing::trace!(kind = ?event.kind(), "host event");
                    self.distribute(event);
                }
                Ok(None) => {
                    tracing::debug!("host event source closed");
                    return Ok(());
                }
                Err(err) => return Err(EventError::Source(Box::new(err))),
            }
        }
    }

    /// Spawns the dedicated producer thread.
    ///
    /// If the source fails, the thread logs the failure and terminates the process with exit
    /// status 1.
    pub fn spawn_producer<S>(&self, source: S) -> std::io::Result<JoinHandle<()>>
    where
        S: HostEventSource<E> + Send + 'static,
    {
        let distributor = self.clone();
        thread::Builder::new()
            .name("event-distributor".to_string())
            .spawn(move || {
                if let Err(err) = distributor.run_producer(source) {
                    tracing::error!("error while waiting for host events: {err}");
                    eprintln!("fatal: error while waiting for host events: {err}");
                    std::process::exit(1);
                }
            })
    }
}

impl<E: Event> DeferredEvents<E> {
    /// Registers a listener invoked from [`DeferredEvents::drain_deferred`] on the emulation
    /// thread.
    pub fn register_deferred_listener(
        &self,
        kind: E::Kind,
        listener: DeferredListener<E>,
    ) -> ListenerId {
        let id = ListenerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.borrow_mut().insert(id, listener);
        let mut map = lock(&self.shared.deferred);
        let updated = with_added(map.get(&kind), id, ());
        map.insert(kind, updated);
        id
    }

    /// Stops new deliveries to the listener. Deliveries already queued still happen.
    pub fn unregister_deferred_listener(&self, kind: E::Kind, id: ListenerId) -> bool {
        if !remove_from(&mut lock(&self.shared.deferred), kind, id) {
            return false;
        }
        if let Some(listener) = self.listeners.borrow_mut().remove(&id) {
            self.retired.borrow_mut().insert(id, listener);
        }
        self.prune_retired();
        true
    }

    /// Queues `event` for the deferred listeners of its kind without running any immediate
    /// listener.
    ///
    /// This is how the emulation thread posts synthetic events: immediate listeners only ever
    /// run on the producer thread. Called from inside a drain, the event is delivered by that
    /// same drain. Returns the number of queued deliveries.
    pub fn post(&self, event: E) -> usize {
        let kind = event.kind();
        self.shared.enqueue_deferred(&kind, &event)
    }

    /// Delivers every queued event, including events queued while draining.
    ///
    /// The queue lock is released around each invocation, so a listener may distribute new
    /// events or change registrations. Returns the number of deliveries.
    pub fn drain_deferred(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some((event, id)) = lock(&self.shared.queue).pop_front() else {
                break;
            };
            let listener = self
                .listeners
                .borrow()
                .get(&id)
                .cloned()
                .or_else(|| self.retired.borrow().get(&id).cloned());
            match listener {
                Some(listener) => {
                    listener.signal_event(&event);
                    delivered += 1;
                }
                None => tracing::warn!(?id, "queued event for an unknown deferred listener"),
            }
        }
        self.prune_retired();
        delivered
    }

    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    fn prune_retired(&self) {
        let mut retired = self.retired.borrow_mut();
        if retired.is_empty() {
            return;
        }
        let queue = lock(&self.shared.queue);
        retired.retain(|id, _| queue.iter().any(|(_, queued)| queued == id));
    }
}
