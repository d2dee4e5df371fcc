//! Common test utilities for slotload integration tests

#[allow(dead_code)]
pub mod engine;

use std::sync::Arc;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use engine::*;

use slotload::{ConnectivityMonitor, ContentSlot, Image, Request, SlotConfig};

/// Request for `name` on the test image host
pub fn request(name: &str) -> Request {
    Request::parse(&format!("https://img.example.com/{name}.jpg")).unwrap()
}

/// Image whose size tells tests apart
#[allow(dead_code)]
pub fn image(size: u32) -> Image {
    Image::new(size, size, vec![0u8; 16])
}

/// Slot wired to a simulated engine that shares `network` with the caller
pub fn create_slot(
    network: &ConnectivityMonitor,
    config: SlotConfig,
) -> (Arc<ContentSlot>, Arc<SimulatedEngine>) {
    let engine = SimulatedEngine::new(network);
    let slot = ContentSlot::new(engine.clone(), config).unwrap();
    (slot, engine)
}
