//! Coalescing frame scheduler.
//!
//! The renderer never loops on its own. It asks the host for one more repaint
//! through [`RepaintHost`] and a pending flag keeps at most one request queued.

/// Anything able to deliver a "repaint available" signal
pub trait RepaintHost {
    fn request_repaint(&mut self);
}

impl RepaintHost for egui::Context {
    fn request_repaint(&mut self) {
        egui::Context::request_repaint(self);
    }
}

/// Host for tests and headless runs; counts requests
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    pub requests: usize,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepaintHost for HeadlessHost {
    fn request_repaint(&mut self) {
        self.requests += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: bool,
    frames: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame unless one is already pending. Returns whether the host
    /// was asked.
    pub fn request_frame(&mut self, host: &mut dyn RepaintHost) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        host.request_repaint();
        true
    }

    /// Mark the start of a frame, clearing the pending flag
    pub fn begin_frame(&mut self) -> bool {
        self.frames += 1;
        std::mem::replace(&mut self.pending, false)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
