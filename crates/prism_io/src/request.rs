//! Asynchronous IO requests.

use parking_lot::Mutex;
use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
};

/// A request for reading the data at a URL, shared between the thread that
/// submits it and the IO lane that handles it.
///
/// The handling lane writes the outcome and then publishes it by setting the
/// handled flag with release ordering. The submitting thread polls
/// [`Self::handled`], which loads the flag with acquire ordering, so once it
/// returns `true` the outcome is fully visible.
#[derive(Debug)]
pub struct IoRequest {
    url: String,
    lane: usize,
    handled: AtomicBool,
    cancelled: AtomicBool,
    outcome: Mutex<IoOutcome>,
}

/// The status of an [`IoRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoStatus {
    /// The request has not been handled yet.
    Pending,
    /// The data was read successfully.
    Ok,
    /// Nothing exists at the resolved location.
    NotFound,
    /// Reading failed for another reason.
    Failed,
    /// The request was cancelled before it was handled.
    Cancelled,
}

#[derive(Debug)]
struct IoOutcome {
    status: IoStatus,
    data: Option<Vec<u8>>,
    error_message: Option<String>,
}

impl IoRequest {
    /// Creates a new pending request for the data at the given URL, to be
    /// handled on the given lane.
    pub fn new(url: impl Into<String>, lane: usize) -> Self {
        Self {
            url: url.into(),
            lane,
            handled: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            outcome: Mutex::new(IoOutcome {
                status: IoStatus::Pending,
                data: None,
                error_message: None,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Whether the request has been handled, successfully or not.
    pub fn handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    /// Returns the current status of the request.
    pub fn status(&self) -> IoStatus {
        self.outcome.lock().status
    }

    /// Returns the error message recorded if handling failed.
    pub fn error_message(&self) -> Option<String> {
        self.outcome.lock().error_message.clone()
    }

    /// Takes the data read for the request, leaving [`None`] in its place.
    pub fn take_data(&self) -> Option<Vec<u8>> {
        self.outcome.lock().data.take()
    }

    /// Flags the request as cancelled. This does not wait for the handling
    /// lane; a lane that has not yet started on the request will skip it.
    pub fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the request has been flagged as cancelled.
    pub fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Records the given read result as the outcome of the request and marks
    /// it as handled.
    ///
    /// # Panics
    /// If the request has already been handled.
    pub fn complete(&self, result: io::Result<Vec<u8>>) {
        match result {
            Ok(data) => self.finish(IoStatus::Ok, Some(data), None),
            Err(error) => {
                let status = if error.kind() == io::ErrorKind::NotFound {
                    IoStatus::NotFound
                } else {
                    IoStatus::Failed
                };
                self.finish(status, None, Some(error.to_string()));
            }
        }
    }

    /// Marks the request as handled without reading anything.
    ///
    /// # Panics
    /// If the request has already been handled.
    pub fn complete_cancelled(&self) {
        self.finish(IoStatus::Cancelled, None, None);
    }

    fn finish(&self, status: IoStatus, data: Option<Vec<u8>>, error_message: Option<String>) {
        {
            let mut outcome = self.outcome.lock();
            assert_eq!(
                outcome.status,
                IoStatus::Pending,
                "Tried to complete IO request for {} twice",
                self.url
            );
            outcome.status = status;
            outcome.data = data;
            outcome.error_message = error_message;
        }
        self.handled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_is_pending_and_unhandled() {
        let request = IoRequest::new("res:mesh.omsh", 2);
        assert_eq!(request.url(), "res:mesh.omsh");
        assert_eq!(request.lane(), 2);
        assert!(!request.handled());
        assert!(!request.cancelled());
        assert_eq!(request.status(), IoStatus::Pending);
        assert!(request.take_data().is_none());
    }

    #[test]
    fn completing_with_data_gives_ok_status_and_data_once() {
        let request = IoRequest::new("a", 0);
        request.complete(Ok(vec![1, 2, 3]));

        assert!(request.handled());
        assert_eq!(request.status(), IoStatus::Ok);
        assert_eq!(request.take_data(), Some(vec![1, 2, 3]));
        assert!(request.take_data().is_none());
    }

    #[test]
    fn completing_with_missing_file_error_gives_not_found_status() {
        let request = IoRequest::new("a", 0);
        request.complete(Err(io::Error::from(io::ErrorKind::NotFound)));

        assert!(request.handled());
        assert_eq!(request.status(), IoStatus::NotFound);
        assert!(request.error_message().is_some());
    }

    #[test]
    fn completing_with_other_error_gives_failed_status() {
        let request = IoRequest::new("a", 0);
        request.complete(Err(io::Error::other("disk on fire")));
        assert_eq!(request.status(), IoStatus::Failed);
        assert_eq!(request.error_message().as_deref(), Some("disk on fire"));
    }

    #[test]
    fn cancelling_sets_flag_without_handling() {
        let request = IoRequest::new("a", 0);
        request.set_cancelled();
        assert!(request.cancelled());
        assert!(!request.handled());

        request.complete_cancelled();
        assert!(request.handled());
        assert_eq!(request.status(), IoStatus::Cancelled);
    }

    #[test]
    #[should_panic]
    fn completing_request_twice_fails() {
        let request = IoRequest::new("a", 0);
        request.complete(Ok(Vec::new()));
        request.complete(Ok(Vec::new()));
    }
}
