use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

type PresentFn = Box<dyn FnOnce() + Send>;

struct PresentJob {
    wake_at: Instant,
    present: PresentFn,
}

/// Background thread that presents drawables at a point in time, so the
/// render thread returns right after submitting.
///
/// Jobs run in submission order; each waits until its `wake_at` has passed.
/// Dropping the presenter runs the jobs still queued, then joins.
pub(crate) struct FramePresenter {
    jobs: Option<Sender<PresentJob>>,
    thread: Option<JoinHandle<()>>,
}

impl FramePresenter {
    pub(crate) fn spawn() -> std::io::Result<Self> {
        let (jobs, queue) = mpsc::channel::<PresentJob>();

        let thread = thread::Builder::new()
            .name("lumen-present".to_string())
            .spawn(move || {
                while let Ok(job) = queue.recv() {
                    let now = Instant::now();
                    if job.wake_at > now {
                        thread::sleep(job.wake_at - now);
                    }
                    (job.present)();
                }
                log::debug!("frame presenter stopped");
            })?;

        Ok(Self {
            jobs: Some(jobs),
            thread: Some(thread),
        })
    }

    /// Queues `present` to run once `wake_at` has passed.
    ///
    /// Runs it inline if the presenter thread is gone.
    pub(crate) fn schedule(&self, wake_at: Instant, present: impl FnOnce() + Send + 'static) {
        let job = PresentJob {
            wake_at,
            present: Box::new(present),
        };
        let rejected = match &self.jobs {
            Some(jobs) => jobs.send(job).err().map(|e| e.0),
            None => Some(job),
        };
        if let Some(job) = rejected {
            log::warn!("frame presenter unavailable, presenting inline");
            (job.present)();
        }
    }
}

impl Drop for FramePresenter {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn schedule_returns_before_the_wake_point() {
        let presenter = FramePresenter::spawn().unwrap();
        let (tx, rx) = mpsc::channel();

        let start = Instant::now();
        let wake_at = start + Duration::from_millis(60);
        presenter.schedule(wake_at, move || tx.send(Instant::now()).unwrap());
        assert!(start.elapsed() < Duration::from_millis(20));

        let presented = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(presented >= wake_at);
    }

    #[test]
    fn past_wake_point_presents_right_away() {
        let presenter = FramePresenter::spawn().unwrap();
        let (tx, rx) = mpsc::channel();

        let start = Instant::now();
        presenter.schedule(start, move || tx.send(Instant::now()).unwrap());

        let presented = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(presented.duration_since(start) < Duration::from_millis(50));
    }

    #[test]
    fn jobs_run_in_order_and_drain_on_drop() {
        let presenter = FramePresenter::spawn().unwrap();
        let (tx, rx) = mpsc::channel();

        let base = Instant::now() + Duration::from_millis(10);
        for i in 0..4 {
            let tx = tx.clone();
            presenter.schedule(base + Duration::from_millis(i * 5), move || tx.send(i).unwrap());
        }
        drop(presenter);

        let order: Vec<u64> = rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
