// Scheduler seam
// Non-blocking jump continuations yield control here before resuming. The
// interpreter takes the scheduler as an explicit object so embedders can
// single-step continuations deterministically in tests instead of depending
// on a host timer.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

pub trait Scheduler: fmt::Debug + Send + Sync {
    /// Completes once control has been yielded and handed back.
    fn yield_now(&self) -> BoxFuture<'static, ()>;
}

/// Default scheduler: parks the continuation for exactly one wakeup, letting
/// the surrounding executor run other ready tasks first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooperativeScheduler;

impl Scheduler for CooperativeScheduler {
    fn yield_now(&self) -> BoxFuture<'static, ()> {
        Box::pin(YieldNow { yielded: false })
    }
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Test scheduler: every yield blocks until a permit is granted with
/// [`ManualScheduler::step`], so a test controls exactly when a jump
/// continuation resumes.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    permits: usize,
    waiting: usize,
    wakers: Vec<Waker>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants one permit, releasing the oldest waiting yield.
    pub fn step(&self) {
        let wakers = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.permits += 1;
            std::mem::take(&mut state.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
    }

    /// Number of continuations currently parked on this scheduler.
    pub fn waiting(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).waiting
    }
}

impl Scheduler for ManualScheduler {
    fn yield_now(&self) -> BoxFuture<'static, ()> {
        Box::pin(WaitForPermit {
            state: Arc::clone(&self.state),
            counted: false,
        })
    }
}

struct WaitForPermit {
    state: Arc<Mutex<ManualState>>,
    counted: bool,
}

impl Future for WaitForPermit {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let was_counted = self.counted;
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.permits > 0 {
                state.permits -= 1;
                if was_counted {
                    state.waiting -= 1;
                }
                drop(state);
                self.counted = false;
                return Poll::Ready(());
            }
            if !was_counted {
                state.waiting += 1;
            }
            state.wakers.push(cx.waker().clone());
        }
        self.counted = true;
        Poll::Pending
    }
}

impl Drop for WaitForPermit {
    fn drop(&mut self) {
        if self.counted {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.waiting -= 1;
        }
    }
}
