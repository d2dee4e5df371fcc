//! Shared test doubles: a manually driven fetch engine and a recording observer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use crate::engine::{CompletionHandler, FetchEngine, FetchOutcome, FetchTask};
use crate::error::FetchError;
use crate::slot::SlotObserver;
use crate::types::{FetchResponse, Image, Priority, Request, TaskId, TaskState};

/// Request number `n`, distinct per `n`
pub(crate) fn request(n: usize) -> Request {
    Request::parse(&format!("https://img.example.com/{n}.png")).unwrap()
}

/// Tiny image tagged with `n` so tests can tell results apart
pub(crate) fn image(n: usize) -> Image {
    Image::new(n as u32, n as u32, vec![n as u8; 4])
}

struct ManualTaskInner {
    state: TaskState,
    priority: Priority,
    error: Option<FetchError>,
    handler: Option<CompletionHandler>,
    immediate: Option<FetchOutcome>,
    resume_calls: usize,
    cancel_calls: usize,
    set_priority_calls: usize,
}

/// Fetch task completed explicitly by the test
///
/// `cancel` marks the task cancelled but keeps the completion handler, the way an engine
/// whose cancellation completes asynchronously would. [`ManualTask::deliver_late`] then
/// fires that handler to simulate a completion racing with the cancel.
pub(crate) struct ManualTask {
    id: TaskId,
    request: Request,
    inner: Mutex<ManualTaskInner>,
}

impl ManualTask {
    pub(crate) fn new(id: TaskId, request: Request) -> Arc<Self> {
        Self::build(id, request, None)
    }

    /// Task that completes synchronously inside `resume`
    pub(crate) fn completing_immediately(
        id: TaskId,
        request: Request,
        outcome: FetchOutcome,
    ) -> Arc<Self> {
        Self::build(id, request, Some(outcome))
    }

    fn build(id: TaskId, request: Request, immediate: Option<FetchOutcome>) -> Arc<Self> {
        Arc::new(Self {
            id,
            request,
            inner: Mutex::new(ManualTaskInner {
                state: TaskState::Idle,
                priority: Priority::Normal,
                error: None,
                handler: None,
                immediate,
                resume_calls: 0,
                cancel_calls: 0,
                set_priority_calls: 0,
            }),
        })
    }

    pub(crate) fn succeed(&self, image: Image, arrived_fast: bool) {
        self.finish(Ok(FetchResponse {
            image,
            arrived_fast,
        }));
    }

    pub(crate) fn fail(&self, error: FetchError) {
        self.finish(Err(error));
    }

    /// Complete a running task; ignored once the task is terminal
    pub(crate) fn finish(&self, outcome: FetchOutcome) {
        let handler = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_terminal() {
                return;
            }
            Self::record(&mut inner, &outcome);
            inner.handler.take()
        };
        if let Some(handler) = handler {
            handler(outcome);
        }
    }

    /// Fire the stored handler regardless of state
    pub(crate) fn deliver_late(&self, outcome: FetchOutcome) {
        let handler = self.inner.lock().unwrap().handler.take();
        if let Some(handler) = handler {
            handler(outcome);
        }
    }

    pub(crate) fn resume_calls(&self) -> usize {
        self.inner.lock().unwrap().resume_calls
    }

    pub(crate) fn cancel_calls(&self) -> usize {
        self.inner.lock().unwrap().cancel_calls
    }

    pub(crate) fn set_priority_calls(&self) -> usize {
        self.inner.lock().unwrap().set_priority_calls
    }

    fn record(inner: &mut ManualTaskInner, outcome: &FetchOutcome) {
        match outcome {
            Ok(_) => inner.state = TaskState::Succeeded,
            Err(error) => {
                inner.state = TaskState::Failed;
                inner.error = Some(error.clone());
            }
        }
    }
}

impl FetchTask for ManualTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn request(&self) -> &Request {
        &self.request
    }

    fn resume(&self, on_complete: CompletionHandler) {
        let immediate = {
            let mut inner = self.inner.lock().unwrap();
            inner.resume_calls += 1;
            if inner.state != TaskState::Idle {
                return;
            }
            inner.state = TaskState::Running;
            match inner.immediate.take() {
                Some(outcome) => {
                    Self::record(&mut inner, &outcome);
                    Some(outcome)
                }
                None => {
                    inner.handler = Some(on_complete);
                    return;
                }
            }
        };
        if let Some(outcome) = immediate {
            on_complete(outcome);
        }
    }

    fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.cancel_calls += 1;
        if inner.state.is_terminal() {
            return;
        }
        inner.state = TaskState::Cancelled;
        inner.error = Some(FetchError::Cancelled);
    }

    fn priority(&self) -> Priority {
        self.inner.lock().unwrap().priority
    }

    fn set_priority(&self, priority: Priority) {
        let mut inner = self.inner.lock().unwrap();
        inner.set_priority_calls += 1;
        if inner.state.is_terminal() {
            return;
        }
        inner.priority = priority;
    }

    fn state(&self) -> TaskState {
        self.inner.lock().unwrap().state
    }

    fn error(&self) -> Option<FetchError> {
        self.inner.lock().unwrap().error.clone()
    }
}

/// Engine handing out [`ManualTask`]s and remembering every one of them
#[derive(Default)]
pub(crate) struct ManualEngine {
    next_id: AtomicU64,
    tasks: Mutex<Vec<Arc<ManualTask>>>,
    served: Mutex<HashMap<Url, FetchOutcome>>,
}

impl ManualEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Tasks created for `url` from now on complete synchronously with `outcome`
    pub(crate) fn serve_immediately(&self, url: &Url, outcome: FetchOutcome) {
        self.served.lock().unwrap().insert(url.clone(), outcome);
    }

    pub(crate) fn tasks(&self) -> Vec<Arc<ManualTask>> {
        self.tasks.lock().unwrap().clone()
    }

    /// The n-th task created by this engine
    pub(crate) fn task(&self, n: usize) -> Arc<ManualTask> {
        self.tasks.lock().unwrap()[n].clone()
    }

    pub(crate) fn created(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}

impl FetchEngine for ManualEngine {
    fn create_task(&self, request: &Request) -> Arc<dyn FetchTask> {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let immediate = self.served.lock().unwrap().get(&request.url).cloned();
        let task = ManualTask::build(id, request.clone(), immediate);
        self.tasks.lock().unwrap().push(task.clone());
        task
    }
}

/// Observer recording every hook invocation
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) started: Mutex<Vec<Vec<Request>>>,
    pub(crate) completed: Mutex<Vec<(TaskId, FetchResponse)>>,
}

impl RecordingObserver {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn started(&self) -> Vec<Vec<Request>> {
        self.started.lock().unwrap().clone()
    }

    pub(crate) fn completed(&self) -> Vec<(TaskId, FetchResponse)> {
        self.completed.lock().unwrap().clone()
    }
}

impl SlotObserver for RecordingObserver {
    fn will_start_fetching(&self, requests: &[Request]) {
        self.started.lock().unwrap().push(requests.to_vec());
    }

    fn did_complete(&self, task: &dyn FetchTask, response: &FetchResponse) {
        self.completed
            .lock()
            .unwrap()
            .push((task.id(), response.clone()));
    }
}
