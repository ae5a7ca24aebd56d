//! Map surface backed by the remote GeoJSON host.
//!
//! Mounted layers are queued to a small pool of fetch workers sharing one
//! blocking HTTP client. Completions travel back over a channel and are
//! collected with [`RemoteSurface::poll_loaded`] (or waited for with
//! [`RemoteSurface::wait_loaded`]) on the owner's thread.
//!
//! ### Notes
//! - A failed fetch leaves an empty layer and logs a warning; it never
//!   reaches the caller as an error.
//! - Transient failures (5xx / network errors) get a short retry.
//! - Requests already sent are not cancelled; completions for layers that
//!   were unmounted meanwhile are reported as stale and their data is
//!   dropped. Queued fetches for unmounted layers are skipped.
//!
//! Typical usage:
//! ```no_run
//! # use freqmap::remote::RemoteSurface;
//! let mut surface = RemoteSurface::new()?;
//! // mount layers through a Session, then:
//! for report in surface.poll_loaded() {
//!     println!("{} features from {}", report.features, report.url);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
use crate::layer::LayerDescriptor;
use crate::models::{FeatureCollection, LayerHandle, LayerKey};
use crate::surface::{MapSurface, RecordingSurface};
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Result of fetching one layer.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub handle: LayerHandle,
    pub key: LayerKey,
    pub url: String,
    pub features: usize,
    /// Highest service count among the loaded features.
    pub max_services: f64,
    /// Features drawn with a visible style.
    pub visible: usize,
    pub error: Option<String>,
    /// The layer was unmounted before its data arrived.
    pub stale: bool,
}

impl LoadReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Concurrent fetches; later mounts wait in the queue.
pub const FETCH_WORKERS: usize = 4;

struct Fetched {
    report: LoadReport,
    collection: Option<FeatureCollection>,
}

struct Job {
    handle: LayerHandle,
    descriptor: LayerDescriptor,
}

pub struct RemoteSurface {
    stack: RecordingSurface,
    data: HashMap<LayerHandle, FeatureCollection>,
    jobs: Sender<Job>,
    receiver: Receiver<Fetched>,
    // Unmounted while queued or in flight
    detached: Arc<Mutex<HashSet<LayerHandle>>>,
    pending: usize,
}

impl RemoteSurface {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("freqmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        let (jobs, queue) = mpsc::channel::<Job>();
        let (sender, receiver) = mpsc::channel();
        let queue = Arc::new(Mutex::new(queue));
        let detached = Arc::new(Mutex::new(HashSet::new()));

        for _ in 0..FETCH_WORKERS {
            let http = http.clone();
            let queue = Arc::clone(&queue);
            let sender = sender.clone();
            let detached = Arc::clone(&detached);
            thread::spawn(move || fetch_worker(&http, &queue, &sender, &detached));
        }

        Ok(Self {
            stack: RecordingSurface::new(),
            data: HashMap::new(),
            jobs,
            receiver,
            detached,
            pending: 0,
        })
    }

    /// Layer stack bookkeeping (z-order, basemap, mount history).
    pub fn stack(&self) -> &RecordingSurface {
        &self.stack
    }

    /// Loaded features of an attached layer.
    pub fn features(&self, handle: LayerHandle) -> Option<&FeatureCollection> {
        self.data.get(&handle)
    }

    /// Fetches still in flight.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Collect every completed fetch without blocking.
    pub fn poll_loaded(&mut self) -> Vec<LoadReport> {
        let mut out = Vec::new();
        while let Ok(fetched) = self.receiver.try_recv() {
            out.push(self.accept(fetched));
        }
        out
    }

    /// Block until all in-flight fetches completed or `timeout` elapsed.
    pub fn wait_loaded(&mut self, timeout: Duration) -> Vec<LoadReport> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while self.pending > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(left) {
                Ok(fetched) => out.push(self.accept(fetched)),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("{} layer fetch(es) still pending", self.pending);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        out
    }

    fn accept(&mut self, fetched: Fetched) -> LoadReport {
        self.pending = self.pending.saturating_sub(1);
        let Fetched {
            mut report,
            collection,
        } = fetched;
        report.stale = !self.stack.is_attached(report.handle);
        if let Ok(mut detached) = self.detached.lock() {
            detached.remove(&report.handle);
        }
        if let Some(err) = &report.error {
            log::warn!("layer {} ({}) failed to load: {err}", report.key, report.url);
        } else if report.stale {
            log::debug!("dropping data for detached layer {}", report.handle);
        } else if let Some(collection) = collection {
            self.data.insert(report.handle, collection);
        }
        report
    }
}

impl MapSurface for RemoteSurface {
    fn mount(&mut self, handle: LayerHandle, descriptor: &LayerDescriptor) {
        self.stack.mount(handle, descriptor);
        let job = Job {
            handle,
            descriptor: descriptor.clone(),
        };
        if self.jobs.send(job).is_ok() {
            self.pending += 1;
        } else {
            log::warn!("fetch workers are gone, layer {handle} stays empty");
        }
    }

    fn unmount(&mut self, handle: LayerHandle) {
        let was_attached = self.stack.is_attached(handle);
        self.stack.unmount(handle);
        self.data.remove(&handle);
        if was_attached && let Ok(mut detached) = self.detached.lock() {
            detached.insert(handle);
        }
    }

    fn bring_to_front(&mut self, handle: LayerHandle) {
        self.stack.bring_to_front(handle);
    }

    fn bring_to_back(&mut self, handle: LayerHandle) {
        self.stack.bring_to_back(handle);
    }

    fn set_basemap(&mut self, url: &str) {
        self.stack.set_basemap(url);
    }
}

fn fetch_worker(
    http: &HttpClient,
    queue: &Mutex<Receiver<Job>>,
    sender: &Sender<Fetched>,
    detached: &Mutex<HashSet<LayerHandle>>,
) {
    loop {
        let job = match queue.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => return,
        };
        // The surface was dropped.
        let Ok(Job { handle, descriptor }) = job else {
            return;
        };
        let skip = detached.lock().is_ok_and(|d| d.contains(&handle));
        let fetched = if skip {
            log::debug!("skipping fetch for detached layer {handle}");
            Fetched {
                report: empty_report(handle, &descriptor),
                collection: None,
            }
        } else {
            fetch_layer(http, handle, &descriptor)
        };
        if sender.send(fetched).is_err() {
            return;
        }
    }
}

fn empty_report(handle: LayerHandle, descriptor: &LayerDescriptor) -> LoadReport {
    LoadReport {
        handle,
        key: descriptor.key.clone(),
        url: descriptor.url.clone(),
        features: 0,
        max_services: 0.0,
        visible: 0,
        error: None,
        stale: false,
    }
}

fn fetch_layer(http: &HttpClient, handle: LayerHandle, descriptor: &LayerDescriptor) -> Fetched {
    let mut report = empty_report(handle, descriptor);
    match get_collection(http, &descriptor.url) {
        Ok(collection) => {
            summarize(&mut report, descriptor, &collection);
            Fetched {
                report,
                collection: Some(collection),
            }
        }
        Err(err) => {
            report.error = Some(format!("{err:#}"));
            Fetched {
                report,
                collection: None,
            }
        }
    }
}

/// Style every feature once, recording counts and the highest frequency.
pub fn summarize(
    report: &mut LoadReport,
    descriptor: &LayerDescriptor,
    collection: &FeatureCollection,
) {
    use crate::style::FeatureStyle;

    report.features = collection.features.len();
    for feature in &collection.features {
        let services = feature.properties.services;
        if services.is_finite() && services > report.max_services {
            report.max_services = services;
        }
        let visible = match descriptor.style(&feature.properties) {
            FeatureStyle::Line(line) => line.weight > 0.0,
            FeatureStyle::Area(area) => {
                area.fill_opacity > 0.0 || descriptor.key == LayerKey::Municipalities
            }
        };
        if visible {
            report.visible += 1;
        }
    }
}

fn get_collection(http: &HttpClient, url: &str) -> Result<FeatureCollection> {
    // Small retry for transient failures (5xx / network errors)
    let mut last_err: Option<anyhow::Error> = None;
    for backoff_ms in [100u64, 300, 700] {
        match http.get(url).send() {
            Ok(r) if r.status().is_success() => {
                return r.json().with_context(|| format!("decode geojson from {url}"));
            }
            Ok(r) if r.status().is_server_error() => {
                last_err = Some(anyhow::anyhow!("HTTP {}", r.status()));
            }
            Ok(r) => bail!("GET {url} failed with HTTP {}", r.status()),
            Err(e) => last_err = Some(e.into()),
        }
        thread::sleep(Duration::from_millis(backoff_ms));
    }
    bail!("GET {url}: network error: {:?}", last_err);
}
