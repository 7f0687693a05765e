//! Service layer: HTTP collaborators of the chat client.

pub mod upload;

pub use upload::{Document, Uploader};
