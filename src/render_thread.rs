//! Dedicated render thread
//!
//! The caller side only packages a [`MeshRenderWork`] snapshot and queues it.
//! The render thread drains the queue in order and runs each unit to
//! completion: build a frame graph, register the base pass, execute.

use crate::backend::GraphicsBackend;
use crate::error::RenderError;
use crate::pipeline::{BasePassRenderer, MeshRenderRequest};
use crate::render_graph::{ExecutionSummary, FrameGraphBuilder, GraphBuilder};
use crate::resources::RenderTarget;
use crate::scene::ViewInfo;
use crate::RendererConfig;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// One queued render
#[derive(Debug, Clone)]
pub struct MeshRenderWork {
    pub request: MeshRenderRequest,
    pub view: ViewInfo,
    pub target: Arc<RenderTarget>,
}

pub(crate) enum RenderMessage {
    Render(Box<MeshRenderWork>),
    /// Reply once everything queued before it has run
    Flush(Sender<()>),
    Shutdown,
}

/// Counters kept by the render thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_submitted: u64,
    pub frames_skipped: u64,
    pub asset_not_ready: u64,
    pub mesh_released: u64,
    pub no_renderable_geometry: u64,
    pub passes_executed: u64,
    pub draw_commands: u64,
    pub dropped_batches: u64,
}

impl RenderStats {
    fn record_frame(&mut self, summary: &ExecutionSummary) {
        self.frames_submitted += 1;
        self.passes_executed += summary.passes_executed as u64;
        self.draw_commands += summary.draw_commands as u64;
        self.dropped_batches += summary.dropped_batches as u64;
    }

    fn record_skip(&mut self, error: &RenderError) {
        self.frames_skipped += 1;
        match error {
            RenderError::AssetNotReady(_) => self.asset_not_ready += 1,
            RenderError::MeshReleased => self.mesh_released += 1,
            RenderError::NoRenderableGeometry(_) => self.no_renderable_geometry += 1,
            RenderError::ShaderResolutionFailure(_) | RenderError::InvalidRequest(_) => {}
        }
    }
}

/// Cloneable sending side of the render thread
#[derive(Clone)]
pub struct RenderQueue {
    sender: Sender<RenderMessage>,
    stats: Arc<Mutex<RenderStats>>,
}

impl RenderQueue {
    /// Queue a render. Returns false when the render thread has stopped.
    pub fn enqueue(&self, work: MeshRenderWork) -> bool {
        self.sender
            .send(RenderMessage::Render(Box::new(work)))
            .is_ok()
    }

    /// Block until every render queued so far has run
    pub fn flush(&self) -> bool {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if self.sender.send(RenderMessage::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.recv().is_ok()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats.lock().clone()
    }
}

impl std::fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderQueue")
            .field("pending", &self.sender.len())
            .finish()
    }
}

pub struct RenderThread {
    queue: RenderQueue,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Start the render thread. It owns `backend` until shutdown.
    pub fn spawn<B: GraphicsBackend + 'static>(
        backend: B,
        config: RendererConfig,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = match config.queue_capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity),
            None => crossbeam_channel::unbounded(),
        };
        let stats = Arc::new(Mutex::new(RenderStats::default()));

        let thread_stats = stats.clone();
        let handle = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run(backend, config, receiver, thread_stats))?;

        Ok(Self {
            queue: RenderQueue { sender, stats },
            handle: Some(handle),
        })
    }

    pub fn queue(&self) -> RenderQueue {
        self.queue.clone()
    }

    pub fn flush(&self) -> bool {
        self.queue.flush()
    }

    pub fn stats(&self) -> RenderStats {
        self.queue.stats()
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        let _ = self.queue.sender.send(RenderMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }
}

fn run<B: GraphicsBackend>(
    mut backend: B,
    config: RendererConfig,
    receiver: Receiver<RenderMessage>,
    stats: Arc<Mutex<RenderStats>>,
) {
    log::info!("Render thread '{}' started", config.thread_name);
    let mut renderer = BasePassRenderer::new(&config);

    for message in receiver.iter() {
        match message {
            RenderMessage::Render(work) => {
                render_one(&mut backend, &mut renderer, &work, &stats);
            }
            RenderMessage::Flush(done) => {
                let _ = done.send(());
            }
            RenderMessage::Shutdown => break,
        }
    }

    log::info!("Render thread '{}' stopped", config.thread_name);
}

fn render_one<B: GraphicsBackend>(
    backend: &mut B,
    renderer: &mut BasePassRenderer,
    work: &MeshRenderWork,
    stats: &Mutex<RenderStats>,
) {
    let mut builder = GraphBuilder::new(backend);
    match renderer.render(&mut builder, &work.request, &work.view, &work.target) {
        Ok(submitted) => {
            let summary = builder.execute();
            log::trace!(
                "Frame done: {} batches, {} draws",
                submitted.batch_count,
                summary.draw_commands
            );
            stats.lock().record_frame(&summary);
        }
        Err(e) => {
            // Nothing was registered against the target; skip execution entirely
            stats.lock().record_skip(&e);
        }
    }
}
