//! Dispatching of IO requests to lanes.

use crate::{
    fs::{Assigns, FileSystem},
    request::IoRequest,
};
use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
};

/// Configuration parameters for an [`IoQueue`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// The number of lanes, each served by its own worker thread. Requests
    /// are assigned to lane `request.lane() % n_lanes`.
    pub n_lanes: usize,
    /// URL prefixes (like `res:`) and the directories they resolve to.
    pub assigns: BTreeMap<String, PathBuf>,
}

/// Dispatches [`IoRequest`]s to lanes that read the requested data from a
/// [`FileSystem`].
///
/// A threaded queue has one worker thread per lane, fed through a channel.
/// Requests on the same lane are handled in submission order. A manual queue
/// has no threads and handles its queued requests when
/// [`Self::process_queued`] is called.
///
/// The queue is cheap to clone; clones share the same lanes. The worker
/// threads are terminated and joined when the last clone is dropped.
#[derive(Clone, Debug)]
pub struct IoQueue {
    shared: Arc<SharedIoQueue>,
}

#[derive(Debug)]
struct SharedIoQueue {
    handler: RequestHandler,
    lanes: Lanes,
}

#[derive(Clone, Debug)]
struct RequestHandler {
    file_system: Arc<dyn FileSystem>,
    assigns: Assigns,
}

enum Lanes {
    Threaded(Vec<LaneWorker>),
    Manual(Mutex<VecDeque<Arc<IoRequest>>>),
}

#[derive(Debug)]
struct LaneWorker {
    sender: Sender<LaneInstruction>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug)]
enum LaneInstruction {
    Handle(Arc<IoRequest>),
    Terminate,
}

impl IoConfig {
    /// Resolves all relative assign directories by prepending the given root
    /// path.
    pub fn resolve_paths(&mut self, root_path: &Path) {
        for directory in self.assigns.values_mut() {
            if directory.is_relative() {
                *directory = root_path.join(&*directory);
            }
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            n_lanes: 1,
            assigns: BTreeMap::new(),
        }
    }
}

impl IoQueue {
    /// Creates a queue with one worker thread for each lane in the given
    /// configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration specifies zero lanes or if a
    /// worker thread could not be spawned.
    pub fn new(config: &IoConfig, file_system: Arc<dyn FileSystem>) -> Result<Self> {
        if config.n_lanes == 0 {
            bail!("IO queue needs at least one lane");
        }

        let handler = RequestHandler::new(config, file_system);

        let workers = (0..config.n_lanes)
            .map(|lane_idx| LaneWorker::spawn(lane_idx, handler.clone()))
            .collect::<Result<Vec<_>>>()?;

        prism_log::debug!("Started IO queue with {} lanes", config.n_lanes);

        Ok(Self {
            shared: Arc::new(SharedIoQueue {
                handler,
                lanes: Lanes::Threaded(workers),
            }),
        })
    }

    /// Creates a queue without worker threads. Submitted requests stay
    /// pending until [`Self::process_queued`] is called.
    pub fn manual(config: &IoConfig, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            shared: Arc::new(SharedIoQueue {
                handler: RequestHandler::new(config, file_system),
                lanes: Lanes::Manual(Mutex::new(VecDeque::new())),
            }),
        }
    }

    /// Returns the number of lanes requests are distributed over. A manual
    /// queue counts as a single lane.
    pub fn n_lanes(&self) -> usize {
        match &self.shared.lanes {
            Lanes::Threaded(workers) => workers.len(),
            Lanes::Manual(_) => 1,
        }
    }

    /// Whether the queue handles requests only when
    /// [`Self::process_queued`] is called.
    pub fn is_manual(&self) -> bool {
        matches!(self.shared.lanes, Lanes::Manual(_))
    }

    /// Resolves the given URL to the path lanes will read from.
    pub fn resolve_url(&self, url: &str) -> PathBuf {
        self.shared.handler.assigns.resolve(url)
    }

    /// Submits the given request for handling on its lane. Returns
    /// immediately.
    pub fn submit(&self, request: Arc<IoRequest>) {
        prism_log::trace!(
            "Submitting IO request for {} on lane {}",
            request.url(),
            request.lane()
        );
        match &self.shared.lanes {
            Lanes::Threaded(workers) => {
                let worker = &workers[request.lane() % workers.len()];
                if let Err(error) = worker.sender.send(LaneInstruction::Handle(request)) {
                    // The worker only disconnects after termination, which
                    // happens when the queue is dropped
                    if let LaneInstruction::Handle(request) = error.into_inner() {
                        prism_log::warn!("IO lane closed, failing request for {}", request.url());
                        request.complete(Err(std::io::Error::other("IO lane closed")));
                    }
                }
            }
            Lanes::Manual(queued) => {
                queued.lock().push_back(request);
            }
        }
    }

    /// Handles all requests queued on a manual queue, in submission order,
    /// on the calling thread. Does nothing for a threaded queue.
    ///
    /// # Returns
    /// The number of handled requests.
    pub fn process_queued(&self) -> usize {
        let Lanes::Manual(queued) = &self.shared.lanes else {
            return 0;
        };
        let requests: Vec<_> = queued.lock().drain(..).collect();
        for request in &requests {
            self.shared.handler.handle(request);
        }
        requests.len()
    }

    /// Returns the number of requests waiting in a manual queue.
    pub fn n_queued(&self) -> usize {
        match &self.shared.lanes {
            Lanes::Threaded(_) => 0,
            Lanes::Manual(queued) => queued.lock().len(),
        }
    }
}

impl RequestHandler {
    fn new(config: &IoConfig, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            file_system,
            assigns: Assigns::new(config.assigns.clone()),
        }
    }

    fn handle(&self, request: &IoRequest) {
        if request.cancelled() {
            prism_log::trace!("Skipping cancelled IO request for {}", request.url());
            request.complete_cancelled();
            return;
        }
        let path = self.assigns.resolve(request.url());
        let result = self.file_system.read(&path);
        if let Err(error) = &result {
            prism_log::debug!("Failed to read {}: {}", path.display(), error);
        }
        request.complete(result);
    }
}

impl LaneWorker {
    fn spawn(lane_idx: usize, handler: RequestHandler) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name(format!("io-lane-{lane_idx}"))
            .spawn(move || Self::run(&receiver, &handler))
            .with_context(|| format!("Could not spawn thread for IO lane {lane_idx}"))?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    fn run(receiver: &Receiver<LaneInstruction>, handler: &RequestHandler) {
        while let Ok(LaneInstruction::Handle(request)) = receiver.recv() {
            handler.handle(&request);
        }
    }

    fn join(&mut self) {
        let _ = self.sender.send(LaneInstruction::Terminate);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                prism_log::error!("IO lane thread panicked");
            }
        }
    }
}

impl Drop for SharedIoQueue {
    fn drop(&mut self) {
        if let Lanes::Threaded(workers) = &mut self.lanes {
            for worker in workers {
                worker.join();
            }
        }
    }
}

impl fmt::Debug for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threaded(workers) => f.debug_tuple("Threaded").field(&workers.len()).finish(),
            Self::Manual(queued) => f.debug_tuple("Manual").field(&queued.lock().len()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fs::MemoryFileSystem, request::IoStatus};
    use std::time::{Duration, Instant};

    fn memory_fs_with(files: &[(&str, &str)]) -> Arc<MemoryFileSystem> {
        let fs = MemoryFileSystem::new();
        for (path, data) in files {
            fs.insert(*path, data.as_bytes().to_vec());
        }
        Arc::new(fs)
    }

    fn wait_until_handled(request: &IoRequest) {
        let start = Instant::now();
        while !request.handled() {
            assert!(
                start.elapsed() < Duration::from_secs(10),
                "IO request was never handled"
            );
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn creating_queue_with_zero_lanes_fails() {
        let config = IoConfig {
            n_lanes: 0,
            ..Default::default()
        };
        assert!(IoQueue::new(&config, memory_fs_with(&[])).is_err());
    }

    #[test]
    fn manual_queue_handles_requests_only_when_processed() {
        let queue = IoQueue::manual(&IoConfig::default(), memory_fs_with(&[("a", "data")]));
        let request = Arc::new(IoRequest::new("a", 0));
        queue.submit(Arc::clone(&request));

        assert!(!request.handled());
        assert_eq!(queue.n_queued(), 1);

        assert_eq!(queue.process_queued(), 1);
        assert!(request.handled());
        assert_eq!(request.status(), IoStatus::Ok);
        assert_eq!(request.take_data(), Some(b"data".to_vec()));
        assert_eq!(queue.n_queued(), 0);
    }

    #[test]
    fn manual_queue_resolves_assigns() {
        let mut config = IoConfig::default();
        config.assigns.insert("res:".to_string(), PathBuf::from("assets"));
        let fs = MemoryFileSystem::new();
        fs.insert(Path::new("assets").join("cube.omsh"), vec![1]);
        let queue = IoQueue::manual(&config, Arc::new(fs));

        let request = Arc::new(IoRequest::new("res:cube.omsh", 0));
        queue.submit(Arc::clone(&request));
        queue.process_queued();

        assert_eq!(request.status(), IoStatus::Ok);
    }

    #[test]
    fn cancelled_request_is_skipped_by_lane() {
        let queue = IoQueue::manual(&IoConfig::default(), memory_fs_with(&[("a", "data")]));
        let request = Arc::new(IoRequest::new("a", 0));
        queue.submit(Arc::clone(&request));
        request.set_cancelled();
        queue.process_queued();

        assert_eq!(request.status(), IoStatus::Cancelled);
        assert!(request.take_data().is_none());
    }

    #[test]
    fn threaded_queue_handles_requests_on_all_lanes() {
        let config = IoConfig {
            n_lanes: 3,
            ..Default::default()
        };
        let queue = IoQueue::new(&config, memory_fs_with(&[("a", "x"), ("b", "yy")])).unwrap();
        assert_eq!(queue.n_lanes(), 3);

        let requests: Vec<_> = (0..6)
            .map(|lane| {
                let url = if lane % 2 == 0 { "a" } else { "missing" };
                let request = Arc::new(IoRequest::new(url, lane));
                queue.submit(Arc::clone(&request));
                request
            })
            .collect();

        for (lane, request) in requests.iter().enumerate() {
            wait_until_handled(request);
            if lane % 2 == 0 {
                assert_eq!(request.status(), IoStatus::Ok);
            } else {
                assert_eq!(request.status(), IoStatus::NotFound);
            }
        }
    }

    #[test]
    fn dropping_threaded_queue_joins_workers() {
        let queue = IoQueue::new(&IoConfig::default(), memory_fs_with(&[("a", "x")])).unwrap();
        let request = Arc::new(IoRequest::new("a", 0));
        queue.submit(Arc::clone(&request));
        wait_until_handled(&request);
        drop(queue);
    }

    #[test]
    fn resolving_paths_makes_relative_assigns_absolute_to_root() {
        let mut config = IoConfig::default();
        config.assigns.insert("res:".to_string(), PathBuf::from("data"));
        config.resolve_paths(Path::new("/project"));
        assert_eq!(config.assigns["res:"], Path::new("/project").join("data"));
    }
}
