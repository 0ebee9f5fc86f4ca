//! Continuous playback scheduler.
//!
//! One output stream is opened when the scheduler is constructed and lives on
//! a dedicated thread until the scheduler is dropped. Each `play` call queues
//! a frame as a segment behind those already scheduled; the stream is
//! started on the first call.
//! If the stream cannot be opened or started, playback is disabled for the
//! rest of the process and frames are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use log::{debug, error, info};

use crate::core::audio::decoder::SampleFrame;
#[cfg(feature = "audio-output")]
use crate::core::audio::error::AudioError;
use crate::core::audio::error::AudioResult;
use crate::core::audio::segment::SegmentQueue;

/// Destination of decoded frames
pub trait AudioSink: Send + Sync {
    fn play(&self, frame: &SampleFrame);
}

enum OutputCommand {
    Start,
    Shutdown,
}

struct OutputHandle {
    commands: mpsc::Sender<OutputCommand>,
    worker: Option<JoinHandle<()>>,
}

pub struct PlaybackScheduler {
    sample_rate: u32,
    queue: Arc<SegmentQueue>,
    active: AtomicBool,
    disabled: Arc<AtomicBool>,
    output: Option<OutputHandle>,
}

impl PlaybackScheduler {
    /// Opens the default output device. Failure is logged and yields a
    /// scheduler in degraded mode rather than an error.
    pub fn start(sample_rate: u32) -> Self {
        let queue = Arc::new(SegmentQueue::new());
        let disabled = Arc::new(AtomicBool::new(false));

        match spawn_output_thread(queue.clone(), sample_rate, disabled.clone()) {
            Ok(output) => {
                info!("Audio engine started.");
                Self::assemble(sample_rate, queue, disabled, Some(output))
            }
            Err(e) => {
                error!("Error starting audio engine: {}. Playback disabled.", e);
                disabled.store(true, Ordering::SeqCst);
                Self::assemble(sample_rate, queue, disabled, None)
            }
        }
    }

    /// A scheduler with no output at all; every frame is discarded
    pub fn degraded(sample_rate: u32) -> Self {
        Self::assemble(
            sample_rate,
            Arc::new(SegmentQueue::new()),
            Arc::new(AtomicBool::new(true)),
            None,
        )
    }

    fn assemble(
        sample_rate: u32,
        queue: Arc<SegmentQueue>,
        disabled: Arc<AtomicBool>,
        output: Option<OutputHandle>,
    ) -> Self {
        Self {
            sample_rate,
            queue,
            active: AtomicBool::new(false),
            disabled,
            output,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_available(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.is_available()
    }

    pub fn queue(&self) -> &Arc<SegmentQueue> {
        &self.queue
    }

    /// Queues `frame` after the segments already scheduled and makes sure the
    /// output is running. The last segment repeats until another arrives.
    pub fn play(&self, frame: &SampleFrame) {
        if !self.is_available() {
            debug!("Audio output unavailable, dropping {} samples", frame.len());
            return;
        }

        let segment: Arc<[f32]> = Arc::from(frame.normalized());
        self.queue.schedule(segment);

        if !self.active.swap(true, Ordering::SeqCst) {
            if let Some(output) = &self.output {
                if output.commands.send(OutputCommand::Start).is_err() {
                    error!("Audio output thread is gone. Playback disabled.");
                    self.disabled.store(true, Ordering::SeqCst);
                    return;
                }
            }
            info!("Audio player node started playing.");
        }
    }
}

impl AudioSink for PlaybackScheduler {
    fn play(&self, frame: &SampleFrame) {
        PlaybackScheduler::play(self, frame);
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        if let Some(mut output) = self.output.take() {
            let _ = output.commands.send(OutputCommand::Shutdown);
            if let Some(worker) = output.worker.take() {
                if worker.join().is_err() {
                    error!("Audio output thread panicked");
                }
            }
        }
    }
}

#[cfg(feature = "audio-output")]
fn spawn_output_thread(
    queue: Arc<SegmentQueue>,
    sample_rate: u32,
    disabled: Arc<AtomicBool>,
) -> AudioResult<OutputHandle> {
    use crate::core::audio::output::OutputStream;

    let (commands, command_rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    // cpal streams are not Send on every platform, so the stream is created
    // and dropped on this thread
    let worker = std::thread::Builder::new()
        .name("audio-output".to_string())
        .spawn(move || {
            let stream = match OutputStream::open(queue, sample_rate) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            for command in command_rx {
                match command {
                    OutputCommand::Start => {
                        if let Err(e) = stream.play() {
                            error!("{}. Playback disabled.", e);
                            disabled.store(true, Ordering::SeqCst);
                        }
                    }
                    OutputCommand::Shutdown => break,
                }
            }
            info!("Audio output {} released", stream.device_name());
        })
        .map_err(|e| AudioError::Thread(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(OutputHandle {
            commands,
            worker: Some(worker),
        }),
        Ok(Err(e)) => {
            let _ = worker.join();
            Err(e)
        }
        Err(_) => {
            let _ = worker.join();
            Err(AudioError::Thread("audio thread exited during startup".to_string()))
        }
    }
}

#[cfg(not(feature = "audio-output"))]
fn spawn_output_thread(
    _queue: Arc<SegmentQueue>,
    _sample_rate: u32,
    _disabled: Arc<AtomicBool>,
) -> AudioResult<OutputHandle> {
    Err(crate::core::audio::error::AudioError::Disabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler_with_command_log() -> (PlaybackScheduler, mpsc::Receiver<OutputCommand>) {
        let (commands, rx) = mpsc::channel();
        let scheduler = PlaybackScheduler::assemble(
            8000,
            Arc::new(SegmentQueue::new()),
            Arc::new(AtomicBool::new(false)),
            Some(OutputHandle {
                commands,
                worker: None,
            }),
        );
        (scheduler, rx)
    }

    #[test]
    fn play_schedules_normalized_segment() {
        let (scheduler, _rx) = scheduler_with_command_log();
        scheduler.play(&SampleFrame::new(vec![32767, 0]));

        let mut out = vec![0.0; 4];
        scheduler.queue().render(&mut out, 1, 1.0);
        assert_eq!(out, vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn consecutive_frames_play_back_to_back() {
        let (scheduler, _rx) = scheduler_with_command_log();
        scheduler.play(&SampleFrame::new(vec![32767]));
        scheduler.play(&SampleFrame::new(vec![0]));
        scheduler.play(&SampleFrame::new(vec![32767, 32767]));

        let mut out = vec![0.0; 5];
        scheduler.queue().render(&mut out, 1, 1.0);
        assert_eq!(out, vec![1.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn output_started_once() {
        let (scheduler, rx) = scheduler_with_command_log();
        scheduler.play(&SampleFrame::new(vec![1]));
        scheduler.play(&SampleFrame::new(vec![2]));
        assert!(scheduler.is_active());

        assert!(matches!(rx.try_recv(), Ok(OutputCommand::Start)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn shutdown_sent_on_drop() {
        let (scheduler, rx) = scheduler_with_command_log();
        drop(scheduler);
        assert!(matches!(rx.try_recv(), Ok(OutputCommand::Shutdown)));
    }

    #[test]
    fn degraded_scheduler_discards_frames() {
        let scheduler = PlaybackScheduler::degraded(8000);
        scheduler.play(&SampleFrame::new(vec![1, 2, 3]));
        assert!(!scheduler.is_available());
        assert!(!scheduler.is_active());
        assert!(scheduler.queue().is_idle());
    }
}
