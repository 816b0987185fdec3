//! Shared page builders and status tokens for despeckle integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use despeckle_oxide::{BinaryImage, TaskStatus};

/// An all-white page.
pub fn page(width: usize, height: usize) -> BinaryImage {
    BinaryImage::new(width, height)
}

/// True when every foreground pixel of `a` is also foreground in `b`.
pub fn is_subset(a: &BinaryImage, b: &BinaryImage) -> bool {
    assert_eq!(a.width(), b.width());
    assert_eq!(a.height(), b.height());
    a.data().iter().zip(b.data()).all(|(&wa, &wb)| wa & !wb == 0)
}

/// True when the rectangle is still fully foreground in `img`.
pub fn rect_intact(img: &BinaryImage, x: usize, y: usize, w: usize, h: usize) -> bool {
    (y..y + h).all(|yy| (x..x + w).all(|xx| img.get(xx, yy)))
}

/// Counts status polls without ever cancelling.
#[derive(Default)]
pub struct CountingStatus {
    polls: AtomicUsize,
}

impl CountingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::Relaxed)
    }
}

impl TaskStatus for CountingStatus {
    fn is_cancelled(&self) -> bool {
        self.polls.fetch_add(1, Ordering::Relaxed);
        false
    }
}

/// Cancels at the n-th status poll, counting from zero.
pub struct CancelAtPoll {
    countdown: AtomicI64,
}

impl CancelAtPoll {
    pub fn new(n: usize) -> Self {
        Self {
            countdown: AtomicI64::new(n as i64),
        }
    }
}

impl TaskStatus for CancelAtPoll {
    fn is_cancelled(&self) -> bool {
        self.countdown.fetch_sub(1, Ordering::Relaxed) <= 0
    }
}
