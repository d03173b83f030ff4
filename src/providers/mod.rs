//! External collaborators the core depends on through narrow traits: object
//! storage, OCR, and VLM captioning. Long-lived handles are built once at
//! service start and shared via `Arc`, never looked up through a global.

pub mod object_store;
pub mod ocr;
pub mod vlm;

pub use object_store::{create_object_store, ObjectStore};
pub use ocr::{create_ocr_backend, OcrBackend};
pub use vlm::{create_vlm_client, VlmClient};
