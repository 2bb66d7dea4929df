//! OCR on a dedicated thread.
//!
//! Recognition can take seconds. Front ends with an event loop hand the engine
//! to an `OcrWorker` and keep their own thread responsive; the capture engine
//! still sees a plain blocking `OcrEngine`.

use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use image::RgbaImage;
use tracing::{debug, warn};

use super::engine::{OcrBox, OcrEngine};

/// A work item for the OCR thread. The reply goes back on its own channel.
struct OcrJob {
    image: RgbaImage,
    reply: Sender<Result<Vec<OcrBox>>>,
}

pub struct OcrWorker {
    sender: Option<Sender<OcrJob>>,
    handle: Option<JoinHandle<()>>,
}

impl OcrWorker {
    /// Moves `engine` onto a new thread that serves jobs until the worker is
    /// dropped.
    pub fn spawn(engine: Box<dyn OcrEngine + Send>) -> Result<Self> {
        let (sender, receiver) = channel::<OcrJob>();

        let handle = thread::Builder::new()
            .name("ocr-worker".to_string())
            .spawn(move || {
                debug!("OCR worker started");
                // Ends once every sender is dropped
                while let Ok(job) = receiver.recv() {
                    let result = engine.recognize(&job.image);
                    if job.reply.send(result).is_err() {
                        warn!("OCR worker: caller went away before the result was ready");
                    }
                }
                debug!("OCR worker finished");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

impl OcrEngine for OcrWorker {
    fn recognize(&self, img: &RgbaImage) -> Result<Vec<OcrBox>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("OCR worker is shut down"))?;

        let (reply, result) = channel();
        sender
            .send(OcrJob {
                image: img.clone(),
                reply,
            })
            .map_err(|_| anyhow!("OCR worker thread has exited"))?;

        result
            .recv()
            .map_err(|_| anyhow!("OCR worker dropped the job"))?
    }
}

impl Drop for OcrWorker {
    fn drop(&mut self) {
        // Closing the channel stops the loop
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("OCR worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ocr_box, FixedOcr};

    #[test]
    fn test_worker_returns_engine_result() {
        let engine = FixedOcr::new(vec![ocr_box(1.0, 2.0, 3.0, 4.0, "hello")]);
        let seen = engine.seen_sizes();
        let worker = OcrWorker::spawn(Box::new(engine)).unwrap();

        let boxes = worker.recognize(&RgbaImage::new(8, 6)).unwrap();

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].text, "hello");
        assert_eq!(*seen.lock().unwrap(), vec![(8, 6)]);
    }

    #[test]
    fn test_worker_propagates_engine_error() {
        let worker = OcrWorker::spawn(Box::new(FixedOcr::failing("no tessdata"))).unwrap();
        let err = worker.recognize(&RgbaImage::new(1, 1)).unwrap_err();
        assert!(err.to_string().contains("no tessdata"));
    }

    #[test]
    fn test_worker_serves_several_jobs_in_order() {
        let engine = FixedOcr::new(Vec::new());
        let seen = engine.seen_sizes();
        let worker = OcrWorker::spawn(Box::new(engine)).unwrap();

        for i in 1..=3 {
            worker.recognize(&RgbaImage::new(i, i)).unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_worker_exits_when_dropped() {
        let worker = OcrWorker::spawn(Box::new(FixedOcr::new(Vec::new()))).unwrap();
        // Drop joins the thread; a hang here would fail the test run
        drop(worker);
    }
}
