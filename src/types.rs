//! Core types for slotload

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

use crate::error::Result;
use crate::presentation::Presentation;

/// Unique identifier for a fetch task handed out by an engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation token identifying one composite task
///
/// Every composite gets a fresh, process-unique id. A slot honours callbacks only while the
/// id of the composite that produced them matches the one it currently owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeId(pub u64);

static NEXT_COMPOSITE_ID: AtomicU64 = AtomicU64::new(1);

impl CompositeId {
    /// Allocate the next process-unique id
    pub fn next() -> Self {
        Self(NEXT_COMPOSITE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CompositeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fetch priority
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Very low priority (-2)
    VeryLow = -2,
    /// Low priority (-1)
    Low = -1,
    /// Normal priority (0)
    #[default]
    Normal = 0,
    /// High priority (1)
    High = 1,
    /// Very high priority (2), used for on-screen slots
    VeryHigh = 2,
}

/// Lifecycle state of a single fetch task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Created but not resumed
    Idle,
    /// Work in flight
    Running,
    /// Finished with a response
    Succeeded,
    /// Finished with an error
    Failed,
    /// Cancelled before finishing
    Cancelled,
}

impl TaskState {
    /// Whether the task can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// State of a content slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// Nothing requested
    Empty,
    /// A composite task is in flight
    Fetching,
    /// A result was presented
    Displayed,
    /// Every member task finished without a success
    Failed,
    /// The last composite was cancelled before it produced anything
    Cancelled,
}

/// Requested pixel size of the decoded image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TargetSize {
    /// Create a new target size
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How the image should be fitted into the slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Scale to fit, preserving aspect ratio
    AspectFit,
    /// Scale to fill, preserving aspect ratio and cropping overflow
    #[default]
    AspectFill,
    /// Stretch to fill
    Fill,
    /// Center without scaling
    Center,
}

/// Cache behaviour requested from the engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Use every cache layer the engine has
    #[default]
    Default,
    /// Skip the memory cache
    ReloadIgnoringMemory,
    /// Skip every cache layer
    ReloadIgnoringAll,
    /// Only return cached data, never hit the network
    CacheOnly,
}

/// Options forwarded verbatim to the fetch engine
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Cache behaviour
    #[serde(default)]
    pub cache_policy: CachePolicy,

    /// Ask the engine to decompress in the background
    #[serde(default)]
    pub decompress: bool,

    /// Engine-specific parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Immutable description of one content fetch
///
/// Requests grouped for one slot are alternatives (e.g. cached thumbnail, then full size).
/// Nothing in this crate inspects the size, mode or options; they are handed to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Resource location
    pub url: Url,

    /// Requested decoded size
    #[serde(default)]
    pub target_size: Option<TargetSize>,

    /// Fitting mode hint
    #[serde(default)]
    pub content_mode: ContentMode,

    /// Opaque engine options
    #[serde(default)]
    pub options: RequestOptions,
}

impl Request {
    /// Create a request for the given URL with default hints
    pub fn new(url: Url) -> Self {
        Self {
            url,
            target_size: None,
            content_mode: ContentMode::default(),
            options: RequestOptions::default(),
        }
    }

    /// Parse the URL and create a request
    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(url)?))
    }

    /// Set the target size hint
    pub fn with_target_size(mut self, size: TargetSize) -> Self {
        self.target_size = Some(size);
        self
    }

    /// Set the content mode hint
    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.content_mode = mode;
        self
    }

    /// Replace the options bundle
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Decoded image handed back by the engine
///
/// The pixel payload is shared, so cloning an `Image` is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data in whatever layout the engine produces
    pub data: Arc<[u8]>,
}

impl Image {
    /// Create an image from its dimensions and pixel data
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }
}

/// Successful result of a fetch task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    /// The decoded image
    pub image: Image,
    /// True when the engine produced the result without asynchronous latency
    /// (memory cache hit); drives the presentation decision
    pub arrived_fast: bool,
}

/// Event emitted during a slot's lifecycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotEvent {
    /// A composite task was built and resumed
    FetchStarted {
        /// Composite generation token
        composite: CompositeId,
        /// Number of alternative requests
        requests: usize,
    },

    /// A result was presented in the slot
    Displayed {
        /// Composite generation token
        composite: CompositeId,
        /// Member task that produced the result
        task: TaskId,
        /// How the result was presented
        presentation: Presentation,
    },

    /// Every member task finished without a success
    Failed {
        /// Composite generation token
        composite: CompositeId,
        /// Error recorded by the last member task, if any
        error: Option<crate::error::FetchError>,
    },

    /// The active composite was cancelled
    Cancelled {
        /// Composite generation token
        composite: CompositeId,
    },

    /// A connectivity recovery replayed the last requests
    RetryTriggered {
        /// Composite generation token of the failed attempt
        composite: CompositeId,
    },

    /// The active composite's priority was changed
    PriorityChanged {
        /// New priority
        priority: Priority,
    },
}
