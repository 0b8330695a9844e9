// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request queue: a bounded FIFO guarded by a mutex and a single condition
//! variable, feeding the single worker thread.

use crate::containers::BoundedFifo;
use crate::gpu::GpuBackend;
use crate::pool::HandlePool;
use crate::request::Request;
use crate::status::TransferStatus;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of [`RequestQueue::dequeue`].
pub(crate) enum Dequeued<G: GpuBackend> {
    Request(Request<G>),
    /// The engine is shutting down and the queue is drained.
    Stop,
}

pub(crate) struct RequestQueue<G: GpuBackend> {
    body: Mutex<BoundedFifo<Request<G>>>,
    not_empty: Condvar,
    should_close: AtomicBool,
}

impl<G: GpuBackend> RequestQueue<G> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            body: Mutex::new(BoundedFifo::with_capacity(capacity)),
            not_empty: Condvar::new(),
            should_close: AtomicBool::new(false),
        }
    }

    /// Push `request`, publish `Pending` on its handle, and wake the worker.
    ///
    /// The `Pending` publication happens under the same mutex acquisition
    /// as the push and strictly before the condvar signal, establishing the
    /// happens-before edge the worker relies on when it later reads or
    /// writes the handle's state (SPEC_FULL.md §4.5).
    pub(crate) fn enqueue(&self, request: Request<G>, handles: &HandlePool<G>) -> bool {
        let handle = request.handle();
        let mut guard = self.body.lock();
        let pushed = guard.push(request);
        handles.publish_status(handle, TransferStatus::Pending);
        self.not_empty.notify_one();
        drop(guard);
        pushed
    }

    /// Block until a request is available or the engine is closing and the
    /// queue is drained.
    pub(crate) fn dequeue(&self) -> Dequeued<G> {
        let mut guard = self.body.lock();
        while guard.is_empty() && !self.should_close.load(Ordering::Acquire) {
            self.not_empty.wait(&mut guard);
        }
        match guard.pop() {
            Some(request) => Dequeued::Request(request),
            None => Dequeued::Stop,
        }
    }

    /// Signal shutdown: broadcast under the mutex so a worker blocked in
    /// `dequeue` wakes and observes `should_close`.
    pub(crate) fn request_stop(&self) {
        let guard = self.body.lock();
        self.should_close.store(true, Ordering::Release);
        self.not_empty.notify_all();
        drop(guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::MockBackend;
    use crate::handle::Handle;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn dummy_request(handle: Handle) -> Request<MockBackend> {
        Request::BufferToBuffer {
            handle,
            src: crate::gpu::mock::MockResource(1),
            dst: crate::gpu::mock::MockResource(2),
            barrier: Default::default(),
        }
    }

    #[test]
    fn enqueue_publishes_pending_before_dequeue_observes_it() {
        let handles = HandlePool::<MockBackend>::new(4);
        let queue = RequestQueue::<MockBackend>::new(4);
        let h = handles.allocate().unwrap();

        queue.enqueue(dummy_request(h), &handles);
        assert_eq!(handles.status(h), Some(TransferStatus::Pending));

        match queue.dequeue() {
            Dequeued::Request(req) => assert_eq!(req.handle(), h),
            Dequeued::Stop => panic!("expected a request"),
        }
    }

    #[test]
    fn stop_wakes_blocked_dequeue_when_empty() {
        let queue = Arc::new(RequestQueue::<MockBackend>::new(4));
        let worker_queue = queue.clone();

        let worker = thread::spawn(move || matches!(worker_queue.dequeue(), Dequeued::Stop));

        thread::sleep(Duration::from_millis(20));
        queue.request_stop();

        assert!(worker.join().unwrap());
    }

    #[test]
    fn fifo_order_preserved() {
        let handles = HandlePool::<MockBackend>::new(8);
        let queue = RequestQueue::<MockBackend>::new(2);

        let hs: Vec<_> = (0..5).map(|_| handles.allocate().unwrap()).collect();
        for &h in &hs {
            queue.enqueue(dummy_request(h), &handles);
        }

        for &expected in &hs {
            match queue.dequeue() {
                Dequeued::Request(req) => assert_eq!(req.handle(), expected),
                Dequeued::Stop => panic!("unexpected stop"),
            }
        }
    }
}
