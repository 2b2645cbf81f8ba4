//! Types for the capture module.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Opaque reference to a mounted ticket view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewHandle(String);

impl ViewHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ViewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A view handed to the presentation layer.
#[derive(Debug)]
pub struct PresentedView {
    pub handle: ViewHandle,
    /// Fires once the view is laid out and painted. `None` when the
    /// presenter cannot tell, in which case callers wait a fixed delay.
    pub painted: Option<oneshot::Receiver<()>>,
}

impl PresentedView {
    /// A view without a painted signal.
    pub fn unsignalled(handle: ViewHandle) -> Self {
        Self {
            handle,
            painted: None,
        }
    }
}
