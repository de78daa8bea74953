// SPDX-License-Identifier: AGPL-3.0-only

//! Memory-mapped register access for the accelerator CSR block
//!
//! [`RegisterIo`] is the seam between the hardware path and whatever backs
//! the registers: a real mapping ([`MappedRegion`]) or the in-process model
//! ([`crate::SimulatedAccelerator`]).
//!
//! Every access takes `&mut self`. The accelerator is a single shared
//! resource with no locking in hardware, so whoever owns the handle owns the
//! accelerator; the borrow checker enforces one in-flight operation.

// MMIO registers are naturally aligned by the bus, so pointer casts are safe
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use crate::error::{AccelError, Result};
use rustix::fs::OFlags;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// 32-bit register port of the accelerator
///
/// Offsets are byte offsets relative to the CSR block base.
pub trait RegisterIo: Debug + Send {
    /// Store `value` to the register at `offset`
    fn write32(&mut self, offset: usize, value: u32);

    /// Load the register at `offset`
    fn read32(&mut self, offset: usize) -> u32;
}

/// CSR block mapped from a device file
///
/// The file can be `/dev/mem` (base = physical CSR address), a UIO node, or
/// a PCIe `resourceN` file (base = offset inside the BAR). The mapping starts
/// at the page containing `base` and covers `span` bytes past it.
pub struct MappedRegion {
    /// Page-aligned start of the mapping
    ptr: NonNull<u8>,
    /// Length passed to mmap
    map_len: usize,
    /// Offset of the CSR block inside the mapping
    block_offset: usize,
    /// Bytes of the CSR block that may be accessed
    span: usize,
    path: PathBuf,
    _file: File,
}

impl Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("map_len", &self.map_len)
            .field("block_offset", &self.block_offset)
            .field("span", &self.span)
            .field("path", &self.path)
            .finish()
    }
}

impl MappedRegion {
    /// Map `span` bytes of register space starting at `base` in `path`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The device file does not exist or cannot be opened read/write
    /// - The file has a known size and `base + span` lies past its end
    /// - `mmap` fails
    pub fn map(path: &Path, base: u64, span: usize) -> Result<Self> {
        if !path.exists() {
            return Err(AccelError::device_not_found(path));
        }
        if span == 0 {
            return Err(AccelError::map_failed("register span is 0"));
        }

        // OFlags::SYNC.bits() is a small positive flag value
        let sync_flag = OFlags::SYNC.bits() as i32;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(sync_flag)
            .open(path)
            .map_err(|e| AccelError::map_failed(format!("Cannot open {}: {e}", path.display())))?;

        // Character devices report 0; only regular and sysfs resource files are checked
        let file_len = file.metadata()?.len();
        let end = base.checked_add(span as u64).ok_or_else(|| {
            AccelError::map_failed(format!("register block {base:#x} + {span:#x} overflows"))
        })?;
        if file_len > 0 && end > file_len {
            return Err(AccelError::map_failed(format!(
                "register block {base:#x}..{end:#x} exceeds {} ({file_len:#x} bytes)",
                path.display()
            )));
        }

        let page = rustix::param::page_size() as u64;
        let aligned = base & !(page - 1);
        let block_offset = (base - aligned) as usize;
        let map_len = block_offset + span;

        tracing::debug!(
            "Mapping {}: base={base:#x} page={aligned:#x} len={map_len:#x}",
            path.display()
        );

        // SAFETY: mmap necessary for MMIO - maps the CSR page into the process.
        // Invariants: (1) file is open read/write and kept alive in the struct;
        // (2) map_len > 0 (span checked above); (3) aligned is a page multiple;
        // (4) on success rustix returns a non-null pointer valid for map_len bytes.
        let raw = unsafe {
            mmap(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                aligned,
            )
            .map_err(|e| AccelError::map_failed(format!("mmap {}: {e}", path.display())))?
        };
        let ptr = NonNull::new(raw.cast::<u8>())
            .ok_or_else(|| AccelError::map_failed("mmap returned null"))?;

        tracing::info!(
            "Mapped accelerator CSRs from {} at {base:#x} ({span} bytes)",
            path.display()
        );

        Ok(Self {
            ptr,
            map_len,
            block_offset,
            span,
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Device file backing the mapping
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accessible bytes past the CSR block base
    #[must_use]
    pub const fn span(&self) -> usize {
        self.span
    }

    fn register_ptr(&self, offset: usize) -> *mut u32 {
        assert!(offset + 4 <= self.span, "Register offset {offset:#x} out of bounds");
        assert!(offset % 4 == 0, "Register offset {offset:#x} not word aligned");
        // SAFETY: block_offset + offset + 4 <= map_len, checked above
        unsafe { self.ptr.as_ptr().add(self.block_offset + offset).cast::<u32>() }
    }
}

impl RegisterIo for MappedRegion {
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped span or is not word aligned.
    fn write32(&mut self, offset: usize, value: u32) {
        let reg = self.register_ptr(offset);
        // SAFETY: write_volatile necessary for MMIO - the store is the side effect.
        // Invariants: reg is inside the live mapping and 4-byte aligned.
        unsafe { reg.write_volatile(value) };
    }

    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped span or is not word aligned.
    fn read32(&mut self, offset: usize) -> u32 {
        let reg = self.register_ptr(offset);
        // SAFETY: read_volatile necessary for MMIO - hardware drives the value.
        // Invariants: reg is inside the live mapping and 4-byte aligned.
        unsafe { reg.read_volatile() }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/map_len are exactly what mmap returned in map(); Drop runs once
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.map_len) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
        tracing::debug!("Unmapped accelerator CSRs from {}", self.path.display());
    }
}

// SAFETY: MappedRegion owns its mapping exclusively. Moving it between threads
// does not invalidate the mapping, and all access goes through &mut self.
unsafe impl Send for MappedRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_reported() {
        let err = MappedRegion::map(Path::new("/nonexistent/uio42"), 0, 0x24).unwrap_err();
        assert!(matches!(err, AccelError::DeviceNotFound { .. }));
    }

    #[test]
    fn zero_span_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(4096).unwrap();
        let err = MappedRegion::map(file.path(), 0, 0).unwrap_err();
        assert!(matches!(err, AccelError::MapFailed { .. }));
    }

    #[test]
    fn base_near_address_limit_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(4096).unwrap();
        let err = MappedRegion::map(file.path(), u64::MAX - 4, 0x24).unwrap_err();
        assert!(matches!(err, AccelError::MapFailed { .. }));
    }

    #[test]
    fn unaligned_base_maps_inside_page() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(8192).unwrap();
        let mut region = MappedRegion::map(file.path(), 0x1010, 0x24).unwrap();
        region.write32(0x20, 0xDEAD_BEEF);
        assert_eq!(region.read32(0x20), 0xDEAD_BEEF);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn access_past_span_panics() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(4096).unwrap();
        let mut region = MappedRegion::map(file.path(), 0, 0x24).unwrap();
        region.read32(0x24);
    }
}
