//! Presentation thread and frame handoff
//!
//! The session thread hands frames over through a single slot guarded by a
//! mutex. A newer frame overwrites one the render thread has not picked up
//! yet, so the presenter is never more than one frame behind and nothing
//! queues up. The presentation context is built by the `activate` closure
//! on the render thread itself and never leaves it.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use terminal_core::Frame;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to activate presentation context: {0}")]
    Activation(String),
    #[error("draw failed: {0}")]
    Draw(String),
    #[error("present failed: {0}")]
    Present(String),
}

/// A presentation context, owned by the render thread
pub trait Presenter {
    fn draw(&mut self, frame: &Frame) -> Result<(), RenderError>;
    fn present(&mut self) -> Result<(), RenderError>;
}

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    stop: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn offer(&self, frame: Frame) {
        let mut slot = self.lock();
        if slot.stop {
            return;
        }
        if let Some(stale) = slot.frame.replace(frame) {
            log::trace!("Frame {} superseded before presentation", stale.seq());
        }
        drop(slot);
        self.wake.notify_one();
    }
}

/// Submits frames to a [`Renderer`]; ignored once the renderer has stopped
#[derive(Clone)]
pub struct FrameHandle {
    shared: Arc<Shared>,
}

impl FrameHandle {
    pub fn update(&self, frame: Frame) {
        self.shared.offer(frame);
    }
}

pub struct Renderer {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Renderer {
    /// Start the render thread and wait for `activate` to finish there.
    /// Activation failure is returned to the caller and the thread is gone
    /// by the time this returns.
    pub fn spawn<P, F>(activate: F) -> Result<Self, RenderError>
    where
        P: Presenter + 'static,
        F: FnOnce() -> Result<P, RenderError> + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread_shared = shared.clone();
        let thread = thread::Builder::new()
            .name("kestrel-render".into())
            .spawn(move || {
                let mut presenter = match activate() {
                    Ok(presenter) => presenter,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                render_loop(&thread_shared, &mut presenter);
                log::debug!("Render thread exiting");
            })
            .map_err(|e| RenderError::Activation(e.to_string()))?;

        let activation = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(RenderError::Activation("render thread exited during activation".into())));
        if let Err(e) = activation {
            let _ = thread.join();
            log::error!("{}", e);
            return Err(e);
        }

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Replace the pending frame. Never blocks on rendering.
    pub fn update(&self, frame: Frame) {
        self.shared.offer(frame);
    }

    /// A handle that can submit frames without owning the renderer
    pub fn frames(&self) -> FrameHandle {
        FrameHandle {
            shared: self.shared.clone(),
        }
    }

    /// Signal the render thread and wait until it has exited, abandoning any
    /// frame it has not started on. The presentation context is dropped on
    /// the render thread before this returns.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        {
            let mut slot = self.shared.lock();
            slot.stop = true;
            slot.frame = None;
        }
        self.shared.wake.notify_one();
        if thread.join().is_err() {
            log::error!("Render thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn render_loop<P: Presenter>(shared: &Shared, presenter: &mut P) {
    loop {
        let frame = {
            let mut slot = shared.lock();
            loop {
                if slot.stop {
                    return;
                }
                if let Some(frame) = slot.frame.take() {
                    break frame;
                }
                slot = shared.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
            }
        };

        if let Err(e) = presenter.draw(&frame).and_then(|()| presenter.present()) {
            log::warn!("Skipping frame {}: {}", frame.seq(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender};
    use std::thread::ThreadId;
    use std::time::Duration;

    use terminal_core::{Dimensions, Screen};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn frame(seq: u64) -> Frame {
        Screen::new(Dimensions::new(4, 2)).frame(seq, false)
    }

    /// Reports each draw, optionally blocking until the test lets it go
    struct GatedPresenter {
        started: Sender<u64>,
        gate: Option<Receiver<()>>,
        presented: Sender<u64>,
        current: u64,
        dropped: Sender<ThreadId>,
    }

    impl Presenter for GatedPresenter {
        fn draw(&mut self, frame: &Frame) -> Result<(), RenderError> {
            self.current = frame.seq();
            let _ = self.started.send(frame.seq());
            if let Some(gate) = &self.gate {
                gate.recv_timeout(TIMEOUT).map_err(|e| RenderError::Draw(e.to_string()))?;
            }
            Ok(())
        }

        fn present(&mut self) -> Result<(), RenderError> {
            let _ = self.presented.send(self.current);
            Ok(())
        }
    }

    impl Drop for GatedPresenter {
        fn drop(&mut self) {
            let _ = self.dropped.send(thread::current().id());
        }
    }

    struct Harness {
        started: Receiver<u64>,
        gate: Sender<()>,
        presented: Receiver<u64>,
        dropped: Receiver<ThreadId>,
    }

    fn spawn_gated(gated: bool) -> (Renderer, Harness) {
        let (started_tx, started) = mpsc::channel();
        let (gate, gate_rx) = mpsc::channel();
        let (presented_tx, presented) = mpsc::channel();
        let (dropped_tx, dropped) = mpsc::channel();
        let renderer = Renderer::spawn(move || {
            Ok(GatedPresenter {
                started: started_tx,
                gate: gated.then_some(gate_rx),
                presented: presented_tx,
                current: 0,
                dropped: dropped_tx,
            })
        })
        .unwrap();
        (
            renderer,
            Harness {
                started,
                gate,
                presented,
                dropped,
            },
        )
    }

    #[test]
    fn test_updates_coalesce_latest_wins() {
        let (mut renderer, harness) = spawn_gated(true);

        renderer.update(frame(1));
        assert_eq!(harness.started.recv_timeout(TIMEOUT).unwrap(), 1);

        // the render thread is stuck drawing frame 1
        renderer.update(frame(2));
        renderer.update(frame(3));
        harness.gate.send(()).unwrap();
        harness.gate.send(()).unwrap();

        assert_eq!(harness.presented.recv_timeout(TIMEOUT).unwrap(), 1);
        assert_eq!(harness.presented.recv_timeout(TIMEOUT).unwrap(), 3);
        renderer.stop();

        let presented: Vec<u64> = harness.presented.try_iter().collect();
        assert!(presented.is_empty(), "unexpected frames {:?}", presented);
    }

    #[test]
    fn test_stop_is_synchronous() {
        let (mut renderer, harness) = spawn_gated(false);
        renderer.update(frame(7));
        assert_eq!(harness.presented.recv_timeout(TIMEOUT).unwrap(), 7);

        renderer.stop();
        assert!(!renderer.is_running());
        // already dropped when stop returned, and not on this thread
        let render_thread = harness.dropped.try_recv().unwrap();
        assert_ne!(render_thread, thread::current().id());

        renderer.update(frame(8));
        renderer.stop();
    }

    #[test]
    fn test_frame_handle_after_stop() {
        let (mut renderer, harness) = spawn_gated(false);
        let frames = renderer.frames();
        frames.update(frame(4));
        assert_eq!(harness.presented.recv_timeout(TIMEOUT).unwrap(), 4);

        renderer.stop();
        frames.update(frame(5));
        assert!(renderer.shared.lock().frame.is_none());
    }

    #[test]
    fn test_stop_abandons_pending_frame() {
        let (mut renderer, harness) = spawn_gated(true);
        renderer.update(frame(1));
        assert_eq!(harness.started.recv_timeout(TIMEOUT).unwrap(), 1);
        renderer.update(frame(2));

        let shared = renderer.shared.clone();
        let stopper = thread::spawn(move || renderer.stop());
        while !shared.lock().stop {
            thread::sleep(Duration::from_millis(1));
        }
        harness.gate.send(()).unwrap();
        stopper.join().unwrap();

        assert_eq!(harness.presented.try_iter().collect::<Vec<_>>(), vec![1]);
        assert!(harness.started.try_iter().next().is_none());
        assert!(harness.dropped.try_recv().is_ok());
    }

    #[test]
    fn test_activation_failure_is_returned() {
        let result = Renderer::spawn(|| -> Result<GatedPresenter, RenderError> {
            Err(RenderError::Activation("no display".into()))
        });
        assert!(matches!(result, Err(RenderError::Activation(msg)) if msg == "no display"));
    }

    #[test]
    fn test_activation_runs_on_render_thread() {
        let (tx, rx) = mpsc::channel();
        let caller = thread::current().id();
        let mut renderer = Renderer::spawn(move || {
            tx.send(thread::current().id()).unwrap();
            let (started, _) = mpsc::channel();
            let (presented, _) = mpsc::channel();
            let (dropped, _) = mpsc::channel();
            Ok(GatedPresenter {
                started,
                gate: None,
                presented,
                current: 0,
                dropped,
            })
        })
        .unwrap();
        assert_ne!(rx.recv_timeout(TIMEOUT).unwrap(), caller);
        renderer.stop();
    }
}
