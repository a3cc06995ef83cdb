//! HTTP check layer
//!
//! Direct REST calls against the system under test.

pub mod api;
mod client;

pub use api::{Auth, DojoApi};
pub use client::{FilePart, HttpClient, HttpRequest, HttpResponse, MultipartForm};
