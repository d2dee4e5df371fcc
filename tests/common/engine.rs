//! Simulated fetch engine driven by the Tokio clock

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use slotload::{
    CompletionHandler, ConnectivityMonitor, FetchEngine, FetchError, FetchOutcome,
    FetchResponse, FetchTask, Image, Priority, Request, TaskId, TaskState,
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// How the simulated engine answers a URL
#[derive(Clone)]
pub enum Route {
    /// Memory cache hit, delivered synchronously from `resume`
    Cached(Image),
    /// Network fetch completing after `latency`
    Remote {
        /// Time until the outcome is delivered
        latency: Duration,
        /// Outcome delivered while the network is reachable
        outcome: FetchOutcome,
    },
}

impl Route {
    /// Successful network fetch of `image`
    pub fn remote(image: Image, latency: Duration) -> Self {
        Route::Remote {
            latency,
            outcome: Ok(FetchResponse {
                image,
                arrived_fast: false,
            }),
        }
    }

    /// Network fetch failing with `error`
    pub fn failing(error: FetchError, latency: Duration) -> Self {
        Route::Remote {
            latency,
            outcome: Err(error),
        }
    }
}

struct TaskInner {
    state: TaskState,
    priority: Priority,
    error: Option<FetchError>,
}

/// Task handed out by [`SimulatedEngine`]
pub struct SimulatedTask {
    id: TaskId,
    request: Request,
    route: Route,
    network: ConnectivityMonitor,
    inner: Arc<Mutex<TaskInner>>,
    cancel: CancellationToken,
}

impl SimulatedTask {
    fn record(inner: &mut TaskInner, outcome: &FetchOutcome) {
        match outcome {
            Ok(_) => inner.state = TaskState::Succeeded,
            Err(error) => {
                inner.state = TaskState::Failed;
                inner.error = Some(error.clone());
            }
        }
    }
}

impl FetchTask for SimulatedTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn request(&self) -> &Request {
        &self.request
    }

    fn resume(&self, on_complete: CompletionHandler) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != TaskState::Idle {
                return;
            }
            inner.state = TaskState::Running;
        }

        let (latency, outcome) = match &self.route {
            Route::Cached(image) => {
                let outcome = Ok(FetchResponse {
                    image: image.clone(),
                    arrived_fast: true,
                });
                Self::record(&mut self.inner.lock().unwrap(), &outcome);
                on_complete(outcome);
                return;
            }
            Route::Remote { latency, outcome } => (*latency, outcome.clone()),
        };

        let inner = self.inner.clone();
        let token = self.cancel.clone();
        let network = self.network.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(latency) => {}
            }
            let outcome = if network.is_reachable() {
                outcome
            } else {
                Err(FetchError::NotConnected)
            };
            {
                let mut inner = inner.lock().unwrap();
                if inner.state.is_terminal() {
                    return;
                }
                SimulatedTask::record(&mut inner, &outcome);
            }
            on_complete(outcome);
        });
    }

    fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() {
            return;
        }
        inner.state = TaskState::Cancelled;
        inner.error = Some(FetchError::Cancelled);
        self.cancel.cancel();
    }

    fn priority(&self) -> Priority {
        self.inner.lock().unwrap().priority
    }

    fn set_priority(&self, priority: Priority) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_terminal() {
            inner.priority = priority;
        }
    }

    fn state(&self) -> TaskState {
        self.inner.lock().unwrap().state
    }

    fn error(&self) -> Option<FetchError> {
        self.inner.lock().unwrap().error.clone()
    }
}

/// Engine answering from a route table, failing remote fetches while `network` is down
pub struct SimulatedEngine {
    network: ConnectivityMonitor,
    routes: Mutex<HashMap<Url, Route>>,
    next_id: AtomicU64,
    created: Mutex<Vec<Arc<SimulatedTask>>>,
}

impl SimulatedEngine {
    /// Engine sharing reachability with `network`
    pub fn new(network: &ConnectivityMonitor) -> Arc<Self> {
        Arc::new(Self {
            network: network.clone(),
            routes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Answer `request` with `route` from now on
    pub fn route(&self, request: &Request, route: Route) {
        self.routes
            .lock()
            .unwrap()
            .insert(request.url.clone(), route);
    }

    /// Every task created so far, oldest first
    pub fn tasks(&self) -> Vec<Arc<SimulatedTask>> {
        self.created.lock().unwrap().clone()
    }

    /// Number of tasks created so far
    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl FetchEngine for SimulatedEngine {
    fn create_task(&self, request: &Request) -> Arc<dyn FetchTask> {
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| {
                Route::failing(
                    FetchError::Engine("no route".to_string()),
                    Duration::from_millis(5),
                )
            });
        let task = Arc::new(SimulatedTask {
            id: TaskId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            request: request.clone(),
            route,
            network: self.network.clone(),
            inner: Arc::new(Mutex::new(TaskInner {
                state: TaskState::Idle,
                priority: Priority::Normal,
                error: None,
            })),
            cancel: CancellationToken::new(),
        });
        self.created.lock().unwrap().push(task.clone());
        task
    }
}
