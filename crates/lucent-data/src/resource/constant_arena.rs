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

//! A fixed-capacity bump allocator of constant buffer elements.

use crate::resource::{DescriptorView, OwnedBuffer};
use lucent_core::renderer::{
    BufferDescriptor, BufferUsage, DeviceCapabilities, RenderDevice, ResourceError,
    ViewDescriptor, CONSTANT_BUFFER_ALIGNMENT,
};
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;

/// A run of `count` consecutive elements starting at element `base`.
pub struct ConstantSlice<T> {
    base: u32,
    count: u32,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: the slice is an index range, whatever `T` implements.
impl<T> Clone for ConstantSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ConstantSlice<T> {}

impl<T> PartialEq for ConstantSlice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.count == other.count
    }
}

impl<T> Eq for ConstantSlice<T> {}

impl<T> fmt::Debug for ConstantSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantSlice")
            .field("base", &self.base)
            .field("count", &self.count)
            .finish()
    }
}

impl<T> ConstantSlice<T> {
    /// Arena index of the first element.
    pub fn base_index(&self) -> u32 {
        self.base
    }

    /// Number of elements.
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Returns `true` for an empty slice.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Constant buffer elements of type `T` in one persistently mapped upload
/// buffer sized for exactly `capacity` elements.
///
/// The arena only grows. Asking for more than it was created for is a fixed
/// sizing bug, so [`allocate`](Self::allocate) aborts instead of reallocating.
pub struct ConstantBufferArena<T: bytemuck::Pod> {
    buffer: OwnedBuffer,
    gpu_base: u64,
    capacity: u32,
    size: Mutex<u32>,
    label: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: bytemuck::Pod> ConstantBufferArena<T> {
    /// Rejected at compile time for element types that break the hardware
    /// constant buffer alignment.
    const ELEMENT_IS_ALIGNED: () = assert!(
        size_of::<T>() > 0 && size_of::<T>() as u64 % CONSTANT_BUFFER_ALIGNMENT == 0,
        "constant buffer elements must be a non-zero multiple of 256 bytes"
    );

    /// Byte size of one element.
    pub const ELEMENT_SIZE: u64 = size_of::<T>() as u64;

    /// Creates the backing upload buffer for `capacity` elements.
    pub fn initialize_with_capacity(
        device: Arc<dyn RenderDevice>,
        capabilities: &DeviceCapabilities,
        capacity: u32,
        label: &str,
    ) -> Result<Self, ResourceError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::ELEMENT_IS_ALIGNED;

        if Self::ELEMENT_SIZE % capabilities.constant_buffer_alignment != 0 {
            return Err(ResourceError::InvalidDescription(format!(
                "element size {} is not aligned to the device's {} bytes",
                Self::ELEMENT_SIZE,
                capabilities.constant_buffer_alignment
            )));
        }
        if capacity == 0 {
            return Err(ResourceError::InvalidDescription(format!(
                "constant arena '{label}' needs a non-zero capacity"
            )));
        }

        let buffer = OwnedBuffer::new(
            device,
            &BufferDescriptor::upload(
                label,
                capacity as u64 * Self::ELEMENT_SIZE,
                BufferUsage::CONSTANT,
            ),
        )?;
        let gpu_base = buffer.gpu_address()?;
        log::info!(
            "ConstantBufferArena({label}): {capacity} elements of {} bytes",
            Self::ELEMENT_SIZE
        );

        Ok(Self {
            buffer,
            gpu_base,
            capacity,
            size: Mutex::new(0),
            label: label.to_owned(),
            _marker: PhantomData,
        })
    }

    /// Reserves the next `count` elements.
    pub fn try_allocate(&self, count: u32) -> Result<ConstantSlice<T>, ResourceError> {
        let mut size = self.size.lock();
        match size.checked_add(count) {
            Some(end) if end <= self.capacity => {
                let base = *size;
                *size = end;
                Ok(ConstantSlice {
                    base,
                    count,
                    _marker: PhantomData,
                })
            }
            _ => Err(ResourceError::ArenaExhausted {
                requested: count,
                size: *size,
                capacity: self.capacity,
            }),
        }
    }

    /// Reserves the next `count` elements.
    ///
    /// # Panics
    /// Panics when `size + count` exceeds the capacity.
    pub fn allocate(&self, count: u32) -> ConstantSlice<T> {
        match self.try_allocate(count) {
            Ok(slice) => slice,
            Err(err) => {
                log::error!("ConstantBufferArena({}): {err}", self.label);
                panic!("ConstantBufferArena({}): {err}", self.label);
            }
        }
    }

    fn check_element(&self, slice: &ConstantSlice<T>, i: u32) -> Result<u32, ResourceError> {
        if i >= slice.count {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(slice.base + i)
    }

    /// Writes element `i` of `slice` through the mapped memory.
    pub fn write(&self, slice: &ConstantSlice<T>, i: u32, value: &T) -> Result<(), ResourceError> {
        let element = self.check_element(slice, i)?;
        self.buffer.write(
            element as u64 * Self::ELEMENT_SIZE,
            bytemuck::bytes_of(value),
        )
    }

    /// Writes all elements of `slice` at once.
    pub fn write_all(&self, slice: &ConstantSlice<T>, values: &[T]) -> Result<(), ResourceError> {
        if values.len() != slice.count as usize {
            return Err(ResourceError::OutOfBounds);
        }
        self.buffer.write(
            slice.base as u64 * Self::ELEMENT_SIZE,
            bytemuck::cast_slice(values),
        )
    }

    /// GPU address of element `i` of `slice`.
    pub fn gpu_address(&self, slice: &ConstantSlice<T>, i: u32) -> Result<u64, ResourceError> {
        let element = self.check_element(slice, i)?;
        Ok(self.gpu_base + element as u64 * Self::ELEMENT_SIZE)
    }

    /// Writes one constant buffer view per element of `slice`, starting at
    /// the first slot of `views`.
    pub fn create_views(
        &self,
        slice: &ConstantSlice<T>,
        views: DescriptorView<'_>,
    ) -> Result<(), ResourceError> {
        if views.count() < slice.count {
            return Err(ResourceError::OutOfBounds);
        }
        for i in 0..slice.count {
            views.offset(i).write(&ViewDescriptor::ConstantBuffer {
                buffer: self.buffer.id(),
                offset: (slice.base + i) as u64 * Self::ELEMENT_SIZE,
                size: Self::ELEMENT_SIZE,
            })?;
        }
        Ok(())
    }

    /// Elements handed out so far.
    pub fn size(&self) -> u32 {
        *self.size.lock()
    }

    /// Elements the arena was created for.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// The backing buffer.
    pub fn buffer(&self) -> &OwnedBuffer {
        &self.buffer
    }
}

impl<T: bytemuck::Pod> fmt::Debug for ConstantBufferArena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantBufferArena")
            .field("label", &self.label)
            .field("element_size", &Self::ELEMENT_SIZE)
            .field("size", &self.size())
            .field("capacity", &self.capacity)
            .finish()
    }
}
