use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use lockstep_time::EmuTime;

use crate::pending::PendingSet;
use crate::{Result, Schedulable, SchedulerError, SyncToken};

/// Handle identifying a device attached to a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchedulableId(u32);

impl SchedulableId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

/// Weak reference to an attached device. The scheduler never keeps a device alive.
pub type SchedulableRef = Weak<RefCell<dyn Schedulable>>;

#[derive(Debug)]
struct State {
    current_time: EmuTime,
    pending: PendingSet,
    owners: HashMap<SchedulableId, SchedulableRef>,
    next_owner: u32,
    paused: bool,
    dispatching: bool,
}

/// Dispatches device callbacks at exact emulated instants.
///
/// The scheduler lives on the emulation thread and is shared between devices as
/// `Rc<Scheduler>`; all methods take `&self` so a device can reschedule itself from inside
/// its own callback. No internal borrow is held while a callback runs.
#[derive(Debug)]
pub struct Scheduler {
    state: RefCell<State>,
}

/// Clears the dispatch flag even if a callback unwinds.
struct DispatchGuard<'a>(&'a RefCell<State>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().dispatching = false;
    }
}

impl Scheduler {
    pub fn new(start: EmuTime) -> Self {
        Self {
            state: RefCell::new(State {
                current_time: start,
                pending: PendingSet::default(),
                owners: HashMap::new(),
                next_owner: 0,
                paused: false,
                dispatching: false,
            }),
        }
    }

    /// Registers a device and returns the id used to schedule on its behalf.
    ///
    /// Takes a weak reference so devices can attach from inside `Rc::new_cyclic`.
    pub fn attach(&self, owner: SchedulableRef) -> SchedulableId {
        let mut st = self.state.borrow_mut();
        let id = SchedulableId(st.next_owner);
        st.next_owner = st
            .next_owner
            .checked_add(1)
            .expect("schedulable id space exhausted");
        st.owners.insert(id, owner);
        id
    }

    /// Convenience wrapper around [`Scheduler::attach`] for an existing `Rc`.
    pub fn attach_rc<T: Schedulable + 'static>(&self, owner: &Rc<RefCell<T>>) -> SchedulableId {
        let weak: Weak<RefCell<T>> = Rc::downgrade(owner);
        self.attach(weak)
    }

    /// Unregisters a device and drops all of its pending sync points.
    pub fn detach(&self, owner: SchedulableId) {
        let mut st = self.state.borrow_mut();
        st.owners.remove(&owner);
        st.pending.remove_owner(owner);
    }

    /// Schedules `owner.execute_at(time, token)`.
    ///
    /// An existing sync point with the same `(owner, token)` is moved rather than duplicated.
    pub fn set_sync_point(
        &self,
        time: EmuTime,
        owner: SchedulableId,
        token: SyncToken,
    ) -> Result<()> {
        let mut st = self.state.borrow_mut();
        if !st.owners.contains_key(&owner) {
            return Err(SchedulerError::UnknownOwner(owner));
        }
        if time < st.current_time {
            return Err(SchedulerError::SyncPointInPast {
                current: st.current_time,
                requested: time,
            });
        }
        st.pending.insert(time, owner, token);
        Ok(())
    }

    /// Cancels one sync point (`Some(token)`) or all sync points of `owner` (`None`).
    ///
    /// Removing something that is not scheduled is a no-op.
    pub fn remove_sync_point(&self, owner: SchedulableId, token: Option<SyncToken>) {
        let mut st = self.state.borrow_mut();
        match token {
            Some(token) => {
                st.pending.remove(owner, token);
            }
            None => {
                st.pending.remove_owner(owner);
            }
        }
    }

    /// Runs every sync point due at or before `target`, in time order.
    ///
    /// Sync points created by the callbacks themselves are picked up in the same call when
    /// they are still due. Returns the number of callbacks delivered. While paused this does
    /// nothing; pausing from inside a callback stops dispatch after that callback.
    pub fn advance_to(&self, target: EmuTime) -> Result<usize> {
        {
            let mut st = self.state.borrow_mut();
            if st.dispatching {
                return Err(SchedulerError::Reentrant);
            }
            if st.paused {
                return Ok(0);
            }
            if target < st.current_time {
                return Err(SchedulerError::TimeWentBackwards {
                    current: st.current_time,
                    requested: target,
                });
            }
            st.dispatching = true;
        }
        let _guard = DispatchGuard(&self.state);

        let mut delivered = 0;
        loop {
            let (point, owner) = {
                let mut st = self.state.borrow_mut();
                if st.paused {
                    tracing::debug!(time = %st.current_time, "paused during dispatch");
                    return Ok(delivered);
                }
                let Some(point) = st.pending.pop_due(target) else {
                    break;
                };
                st.current_time = point.time;
                let owner = st.owners.get(&point.owner).and_then(Weak::upgrade);
                if owner.is_none() {
                    st.owners.remove(&point.owner);
                    st.pending.remove_owner(point.owner);
                }
                (point, owner)
            };

            let Some(owner) = owner else {
                tracing::warn!(
                    owner = point.owner.as_raw(),
                    token = point.token,
                    "dropping sync point of a schedulable that no longer exists"
                );
                continue;
            };
            let mut device = owner
                .try_borrow_mut()
                .map_err(|_| SchedulerError::OwnerBusy(point.owner))?;
            tracing::trace!(
                time = %point.time,
                owner = point.owner.as_raw(),
                token = point.token,
                "sync point"
            );
            device.execute_at(point.time, point.token)?;
            delivered += 1;
        }

        self.state.borrow_mut().current_time = target;
        Ok(delivered)
    }

    /// The instant being dispatched, or the target of the last completed `advance_to`.
    pub fn current_time(&self) -> EmuTime {
        self.state.borrow().current_time
    }

    pub fn pause(&self) {
        self.state.borrow_mut().paused = true;
    }

    pub fn unpause(&self) {
        self.state.borrow_mut().paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn next_sync_point_time(&self) -> Option<EmuTime> {
        self.state.borrow().pending.next_time()
    }

    pub fn sync_point_time(&self, owner: SchedulableId, token: SyncToken) -> Option<EmuTime> {
        self.state.borrow().pending.time_of(owner, token)
    }
}
