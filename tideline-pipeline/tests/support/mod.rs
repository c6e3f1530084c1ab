//! Shared test doubles for the pipelining scenario suites: a scriptable
//! conduit, a recording worker handle and a slot-stashing server handler.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tideline_pipeline::{
    Conduit, ResponseSlot, ServiceError, ServiceHandler, WorkerHandle, WriteArm, WriteOutcome,
};

/// Scriptable I/O controller.
///
/// In immediate mode every push is "written" and its arm completes
/// synchronously. With `set_defer(true)` (or while writes are paused) pushes
/// accumulate in a pending buffer until the test completes or purges them,
/// which models a controller that has not flushed to the socket yet.
pub struct TestConduit<Out> {
    shared: Rc<RefCell<ConduitState<Out>>>,
}

struct ConduitState<Out> {
    written: Vec<(Out, Option<Duration>)>,
    pending: VecDeque<(Out, Option<Duration>, WriteArm)>,
    defer: bool,
    capacity: Option<usize>,
    write_outcome: WriteOutcome,
    reads_paused: bool,
    writes_paused: bool,
    ready_signaled: bool,
    resets: u32,
    closed: bool,
    pause_writes_calls: u32,
    resume_writes_calls: u32,
}

impl<Out> TestConduit<Out> {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(ConduitState {
                written: Vec::new(),
                pending: VecDeque::new(),
                defer: false,
                capacity: None,
                write_outcome: WriteOutcome::Success,
                reads_paused: false,
                writes_paused: false,
                ready_signaled: false,
                resets: 0,
                closed: false,
                pause_writes_calls: 0,
                resume_writes_calls: 0,
            })),
        }
    }

    /// Hold pushes in the pending buffer instead of completing them.
    pub fn set_defer(&self, defer: bool) {
        self.shared.borrow_mut().defer = defer;
    }

    /// Cap the pending buffer; pushes above it are refused.
    pub fn set_capacity(&self, capacity: Option<usize>) {
        self.shared.borrow_mut().capacity = capacity;
    }

    /// Outcome reported for immediate-mode writes.
    pub fn set_write_outcome(&self, outcome: WriteOutcome) {
        self.shared.borrow_mut().write_outcome = outcome;
    }

    /// Complete every pending push with `outcome` (in order). Successful
    /// ones count as written.
    pub fn complete_pending(&self, outcome: WriteOutcome) {
        loop {
            let entry = self.shared.borrow_mut().pending.pop_front();
            let Some((message, timestamp, arm)) = entry else {
                break;
            };
            if outcome == WriteOutcome::Success {
                self.shared.borrow_mut().written.push((message, timestamp));
            }
            arm(outcome);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.shared.borrow().pending.len()
    }

    pub fn written_stamps(&self) -> Vec<Option<Duration>> {
        self.shared.borrow().written.iter().map(|(_, t)| *t).collect()
    }

    pub fn reads_paused(&self) -> bool {
        self.shared.borrow().reads_paused
    }

    pub fn writes_paused(&self) -> bool {
        self.shared.borrow().writes_paused
    }

    pub fn closed(&self) -> bool {
        self.shared.borrow().closed
    }

    pub fn resets(&self) -> u32 {
        self.shared.borrow().resets
    }

    pub fn ready_signaled(&self) -> bool {
        self.shared.borrow().ready_signaled
    }

    pub fn pause_writes_calls(&self) -> u32 {
        self.shared.borrow().pause_writes_calls
    }

    pub fn resume_writes_calls(&self) -> u32 {
        self.shared.borrow().resume_writes_calls
    }
}

impl<Out: Clone> TestConduit<Out> {
    /// Messages written to the wire, in order.
    pub fn written(&self) -> Vec<Out> {
        self.shared
            .borrow()
            .written
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }
}

impl<Out> Clone for TestConduit<Out> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<Out> Default for TestConduit<Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out: 'static> Conduit<Out> for TestConduit<Out> {
    fn push(&mut self, message: Out, timestamp: Option<Duration>, arm: WriteArm) -> bool {
        let outcome = {
            let mut st = self.shared.borrow_mut();
            if st.defer || st.writes_paused {
                if let Some(cap) = st.capacity
                    && st.pending.len() >= cap
                {
                    return false;
                }
                st.pending.push_back((message, timestamp, arm));
                return true;
            }
            if st.write_outcome == WriteOutcome::Success {
                st.written.push((message, timestamp));
            }
            st.write_outcome
        };
        // Immediate mode: fire the arm outside the state borrow.
        arm(outcome);
        true
    }

    fn pause_reads(&mut self) {
        self.shared.borrow_mut().reads_paused = true;
    }

    fn resume_reads(&mut self) {
        self.shared.borrow_mut().reads_paused = false;
    }

    fn pause_writes(&mut self) {
        let mut st = self.shared.borrow_mut();
        st.writes_paused = true;
        st.pause_writes_calls += 1;
    }

    fn resume_writes(&mut self) {
        let mut st = self.shared.borrow_mut();
        st.writes_paused = false;
        st.resume_writes_calls += 1;
    }

    fn ready_for_data(&mut self) {
        self.shared.borrow_mut().ready_signaled = true;
    }

    fn purge_outgoing(&mut self, _outcome: WriteOutcome) {
        // Writes complete synchronously in this controller; nothing ever
        // sits in the outgoing stage.
    }

    fn purge_pending(&mut self, outcome: WriteOutcome) {
        let drained: Vec<_> = self.shared.borrow_mut().pending.drain(..).collect();
        for (_message, _timestamp, arm) in drained {
            arm(outcome);
        }
    }

    fn reset(&mut self) {
        self.shared.borrow_mut().resets += 1;
    }

    fn close(&mut self) {
        self.shared.borrow_mut().closed = true;
    }
}

/// Worker handle that records everything asked of it.
pub struct TestWorker<M> {
    shared: Rc<RefCell<WorkerLog<M>>>,
}

struct WorkerLog<M> {
    connects: Vec<String>,
    reconnects: Vec<String>,
    scheduled: Vec<(Duration, M)>,
    posted: Vec<M>,
}

impl<M> TestWorker<M> {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(WorkerLog {
                connects: Vec::new(),
                reconnects: Vec::new(),
                scheduled: Vec::new(),
                posted: Vec::new(),
            })),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.shared.borrow().connects.len()
    }

    pub fn reconnect_count(&self) -> usize {
        self.shared.borrow().reconnects.len()
    }

    pub fn scheduled_count(&self) -> usize {
        self.shared.borrow().scheduled.len()
    }

    /// Take every scheduled message, leaving the log empty.
    pub fn take_scheduled(&self) -> Vec<(Duration, M)> {
        self.shared.borrow_mut().scheduled.drain(..).collect()
    }

    /// Take every posted message, leaving the log empty.
    pub fn take_posted(&self) -> Vec<M> {
        self.shared.borrow_mut().posted.drain(..).collect()
    }
}

impl<M> Clone for TestWorker<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<M> Default for TestWorker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> WorkerHandle<M> for TestWorker<M> {
    fn connect(&self, address: &str) {
        self.shared.borrow_mut().connects.push(address.to_string());
    }

    fn reconnect(&self, address: &str) {
        self.shared.borrow_mut().reconnects.push(address.to_string());
    }

    fn schedule(&self, delay: Duration, message: M) {
        self.shared.borrow_mut().scheduled.push((delay, message));
    }

    fn post(&self, message: M) {
        self.shared.borrow_mut().posted.push(message);
    }
}

/// Server handler that stashes every slot so tests control completion order.
///
/// Failure responses are rendered as `"<kind>:<request>"`.
#[derive(Clone, Default)]
pub struct StashHandler {
    slots: Rc<RefCell<Vec<(String, ResponseSlot<String>)>>>,
    processed: Rc<RefCell<Vec<String>>>,
}

impl StashHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached `process_request`, in order.
    pub fn processed(&self) -> Vec<String> {
        self.processed.borrow().clone()
    }

    /// Number of slots still held.
    pub fn held_slots(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Resolve the stashed slot for `request` with `response`.
    pub fn resolve(&self, request: &str, response: &str) {
        let slot = self.take_slot(request);
        slot.resolve(response.to_string());
    }

    /// Reject the stashed slot for `request` with `cause`.
    pub fn reject(&self, request: &str, cause: ServiceError) {
        let slot = self.take_slot(request);
        slot.reject(cause);
    }

    /// Drop the stashed slot for `request` without completing it.
    pub fn abandon(&self, request: &str) {
        drop(self.take_slot(request));
    }

    fn take_slot(&self, request: &str) -> ResponseSlot<String> {
        let position = self
            .slots
            .borrow()
            .iter()
            .position(|(r, _)| r == request)
            .unwrap_or_else(|| panic!("no stashed slot for request {request:?}"));
        self.slots.borrow_mut().remove(position).1
    }
}

impl ServiceHandler<String, String> for StashHandler {
    fn process_request(&self, request: String, reply: ResponseSlot<String>) {
        self.processed.borrow_mut().push(request.clone());
        self.slots.borrow_mut().push((request, reply));
    }

    fn process_failure(&self, request: &String, cause: &ServiceError) -> String {
        format!("{}:{}", cause.kind_tag(), request)
    }
}
