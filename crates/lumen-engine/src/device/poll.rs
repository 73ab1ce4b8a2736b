use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Background thread driving `Device::poll`, so completion callbacks run
/// without the render thread blocking on the GPU.
///
/// Each `request` wakes the thread once; bursts of requests are coalesced
/// into a single wait.
pub(crate) struct CompletionPoller {
    trigger: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CompletionPoller {
    pub(crate) fn spawn(device: wgpu::Device) -> std::io::Result<Self> {
        let (trigger, requests) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("wgpu-poll".to_string())
            .spawn(move || {
                while requests.recv().is_ok() {
                    while requests.try_recv().is_ok() {}

                    let waited = device.poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: None,
                    });
                    if let Err(err) = waited {
                        log::warn!("completion poller: {err}");
                    }
                }
                log::debug!("completion poller stopped");
            })?;

        Ok(Self {
            trigger: Some(trigger),
            thread: Some(thread),
        })
    }

    /// Wakes the poller after a submission.
    pub(crate) fn request(&self) {
        if let Some(trigger) = &self.trigger {
            let _ = trigger.send(());
        }
    }
}

impl Drop for CompletionPoller {
    fn drop(&mut self) {
        // Closing the channel ends the loop once the current wait returns.
        self.trigger.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
