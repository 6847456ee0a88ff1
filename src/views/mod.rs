//! View models for the portal pages.
//!
//! Each view owns its state for one mount: it is created, fed fetch results,
//! rendered, and dropped. Nothing here talks to the network; the services layer
//! runs the fetches and hands results back in.
pub mod form;
pub mod schedule;
pub mod status;

use serde::Serialize;

/// Coloured dot with hover text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub color: &'static str,
    pub label: &'static str,
}

/// Fetch state of a view's data
#[derive(Debug, Clone, PartialEq)]
pub enum Load<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Load<T> {
    pub fn from_result(result: Result<T, String>) -> Self {
        match result {
            Ok(data) => Load::Loaded(data),
            Err(message) => Load::Failed(message),
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Load::Loaded(data) => Some(data),
            _ => None,
        }
    }
}
