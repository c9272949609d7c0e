// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::DescriptorHeapKind;
use std::fmt;

/// An error related to the creation or use of a GPU resource (buffers, textures,
/// descriptor ranges, constant slices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds (e.g., in a buffer).
    OutOfBounds,
    /// A descriptor heap has no contiguous range of the requested size.
    DescriptorHeapExhausted {
        /// The kind of heap that ran out.
        kind: DescriptorHeapKind,
        /// Number of descriptors requested.
        requested: u32,
        /// Number of descriptors still free (possibly fragmented).
        available: u32,
    },
    /// A constant buffer arena cannot hold the requested number of elements.
    ArenaExhausted {
        /// Number of elements requested.
        requested: u32,
        /// Elements already handed out.
        size: u32,
        /// Total elements the arena was created for.
        capacity: u32,
    },
    /// A resource description is malformed (zero size, unsupported combination, ...).
    InvalidDescription(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => {
                write!(f, "Resource access out of bounds.")
            }
            ResourceError::DescriptorHeapExhausted {
                kind,
                requested,
                available,
            } => write!(
                f,
                "Descriptor heap '{}' exhausted: requested {requested}, {available} free",
                kind.name()
            ),
            ResourceError::ArenaExhausted {
                requested,
                size,
                capacity,
            } => write!(
                f,
                "Constant buffer arena exhausted: requested {requested} with {size}/{capacity} in use"
            ),
            ResourceError::InvalidDescription(msg) => {
                write!(f, "Invalid resource description: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error that can occur within the frame loop or graphics device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// An operation was attempted before the rendering system was initialized.
    NotInitialized,
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// Command lists could not be submitted to a queue.
    SubmissionFailed(String),
    /// The swap chain failed to present.
    PresentFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The graphics device was lost (e.g., GPU driver crashed or was removed).
    /// This is a catastrophic error; the frame loop stops and never retries.
    DeviceLost,
    /// The frame loop was already stopped by an earlier failure.
    Stopped,
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl RenderError {
    /// Returns `true` for the errors after which no further frame may be issued.
    pub fn is_device_loss(&self) -> bool {
        matches!(self, RenderError::DeviceLost | RenderError::PresentFailed(_))
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The rendering system is not initialized.")
            }
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::SubmissionFailed(msg) => {
                write!(f, "Command list submission failed: {msg}")
            }
            RenderError::PresentFailed(msg) => {
                write!(f, "Presentation failed: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
            RenderError::Stopped => {
                write!(f, "The frame loop has been stopped after a device failure.")
            }
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn exhaustion_display_names_the_heap() {
        let err = ResourceError::DescriptorHeapExhausted {
            kind: DescriptorHeapKind::CbvSrvUav,
            requested: 8,
            available: 3,
        };
        assert_eq!(
            format!("{err}"),
            "Descriptor heap 'cbv_srv_uav' exhausted: requested 8, 3 free"
        );
    }

    #[test]
    fn render_error_display_wrapping_resource_error() {
        let render_err: RenderError = ResourceError::OutOfBounds.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Resource access out of bounds."
        );
        assert!(render_err.source().is_some());
    }

    #[test]
    fn device_loss_classification() {
        assert!(RenderError::DeviceLost.is_device_loss());
        assert!(RenderError::PresentFailed("removed".into()).is_device_loss());
        assert!(!RenderError::SubmissionFailed("closed list".into()).is_device_loss());
        assert!(!RenderError::ResourceError(ResourceError::NotFound).is_device_loss());
    }
}
