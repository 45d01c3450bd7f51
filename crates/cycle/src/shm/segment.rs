// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! POSIX shared memory segments (`shm_open` + `ftruncate` + `mmap`).
//!
//! The exporting process creates and fills a segment, the importing process
//! opens and maps it. Mappings are released on drop; names are removed only
//! through [`ShmSegment::unlink`].

use std::ffi::CString;
use std::io;
use std::ptr;

use super::{Result, ShmError};
use crate::config::MAX_SEGMENT_NAME_LEN;

/// A mapped shared memory segment.
pub struct ShmSegment {
    ptr: *mut u8,
    /// Bytes mapped; at least one, since empty mappings are rejected.
    mapped: usize,
    name: String,
}

// SAFETY: the mapping is plain bytes owned by this value; access goes
// through `&self`/`&mut self`, or through atomics placed in it by the caller.
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Create (or replace) segment `name` with `size` zeroed bytes.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let c_name = c_name(name)?;
        let mapped = size.max(1);

        // SAFETY:
        // - c_name is a valid null-terminated CString
        // - shm_unlink on a missing name only sets errno, which is ignored
        // - O_CREAT|O_EXCL after the unlink guarantees a fresh segment
        let fd = unsafe {
            libc::shm_unlink(c_name.as_ptr());
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };
        if fd < 0 {
            return Err(ShmError::Create(io::Error::last_os_error()));
        }

        // SAFETY: fd is the valid descriptor returned above.
        if unsafe { libc::ftruncate(fd, mapped as libc::off_t) } < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is valid and closed exactly once on this path.
            unsafe { libc::close(fd) };
            return Err(ShmError::Truncate(err));
        }

        let ptr = map(fd, mapped)?;
        log::trace!("[SHM] created {} ({} bytes)", name, size);
        Ok(Self {
            ptr,
            mapped,
            name: name.to_string(),
        })
    }

    /// Open and map existing segment `name`, which must hold `size` bytes.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        let c_name = c_name(name)?;
        let mapped = size.max(1);

        // SAFETY: c_name is a valid CString; mode is ignored without O_CREAT.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                return Err(ShmError::NotFound(name.to_string()));
            }
            return Err(ShmError::Open(err));
        }

        // SAFETY: fd is valid; stat is a plain-old-data out parameter.
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        // SAFETY: fd is valid and stat points to writable memory.
        if unsafe { libc::fstat(fd, &mut stat) } < 0 {
            let err = io::Error::last_os_error();
            // SAFETY: fd is valid and closed exactly once on this path.
            unsafe { libc::close(fd) };
            return Err(ShmError::Open(err));
        }
        let actual = usize::try_from(stat.st_size).unwrap_or(0);
        if actual < mapped {
            // SAFETY: fd is valid and closed exactly once on this path.
            unsafe { libc::close(fd) };
            return Err(ShmError::SizeMismatch {
                expected: size,
                actual,
            });
        }

        let ptr = map(fd, mapped)?;
        Ok(Self {
            ptr,
            mapped,
            name: name.to_string(),
        })
    }

    /// Remove segment `name`. Missing segments are not an error.
    pub fn unlink(name: &str) -> Result<()> {
        let c_name = c_name(name)?;
        // SAFETY: c_name is a valid CString; only the name table is affected.
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(ShmError::Io(err));
            }
        }
        Ok(())
    }

    /// Whether a segment called `name` currently exists.
    pub fn exists(name: &str) -> bool {
        let Ok(c_name) = CString::new(name) else {
            return false;
        };
        // SAFETY: c_name is a valid CString.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
        if fd < 0 {
            return false;
        }
        // SAFETY: fd is valid and not used afterwards.
        unsafe { libc::close(fd) };
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes mapped.
    pub fn size(&self) -> usize {
        self.mapped
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// The first `len` mapped bytes.
    pub(crate) fn bytes(&self, len: usize) -> &[u8] {
        // SAFETY: ptr maps `mapped` bytes for the lifetime of self and the
        // length is clamped to that.
        unsafe { std::slice::from_raw_parts(self.ptr, len.min(self.mapped)) }
    }

    pub(crate) fn bytes_mut(&mut self, len: usize) -> &mut [u8] {
        // SAFETY: as in `bytes`; `&mut self` makes this the only local view.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, len.min(self.mapped)) }
    }
}

impl std::fmt::Debug for ShmSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmSegment")
            .field("name", &self.name)
            .field("mapped", &self.mapped)
            .finish()
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        // SAFETY: ptr/mapped come from the successful mmap in create/open and
        // are unmapped exactly once, here.
        unsafe {
            libc::munmap(self.ptr.cast::<libc::c_void>(), self.mapped);
        }
    }
}

/// Validate a POSIX segment name: one leading `/`, no other, bounded length.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let Some(rest) = name.strip_prefix('/') else {
        return Err(ShmError::InvalidName(format!("must start with '/': {}", name)));
    };
    if rest.is_empty() || rest.contains('/') {
        return Err(ShmError::InvalidName(format!("bad segment name: {}", name)));
    }
    if rest.len() > MAX_SEGMENT_NAME_LEN {
        return Err(ShmError::InvalidName(format!(
            "longer than {} bytes: {}",
            MAX_SEGMENT_NAME_LEN, name
        )));
    }
    Ok(())
}

fn c_name(name: &str) -> Result<CString> {
    validate_name(name)?;
    CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))
}

/// Map `len` bytes of `fd` read-write and close the descriptor.
fn map(fd: libc::c_int, len: usize) -> Result<*mut u8> {
    // SAFETY:
    // - null address lets the kernel choose the placement
    // - fd is valid and sized to at least `len` bytes by the caller
    // - MAP_FAILED is checked below
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    let err = io::Error::last_os_error();
    // SAFETY: fd is valid; the mapping keeps its own reference to the object.
    unsafe { libc::close(fd) };
    if ptr == libc::MAP_FAILED {
        return Err(ShmError::Map(err));
    }
    Ok(ptr.cast::<u8>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("/cycle_test_{}_{}_{:x}", tag, std::process::id(), fastrand::u64(..))
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("/cycle_obj_1f").is_ok());
        assert!(validate_name("cycle").is_err());
        assert!(validate_name("/a/b").is_err());
        assert!(validate_name("/").is_err());
        assert!(validate_name(&format!("/{}", "x".repeat(300))).is_err());
    }

    #[test]
    fn test_create_open_share_bytes() {
        let name = unique_name("share");
        let mut writer = ShmSegment::create(&name, 16).unwrap();
        writer.bytes_mut(4).copy_from_slice(&[1, 2, 3, 4]);

        let reader = ShmSegment::open(&name, 16).unwrap();
        assert_eq!(reader.bytes(4), [1, 2, 3, 4]);
        assert_eq!(reader.bytes(16)[4..], [0; 12]);

        drop(writer);
        drop(reader);
        ShmSegment::unlink(&name).unwrap();
        assert!(!ShmSegment::exists(&name));
    }

    #[test]
    fn test_open_missing_and_oversized() {
        let name = unique_name("missing");
        assert!(matches!(ShmSegment::open(&name, 8), Err(ShmError::NotFound(_))));

        let _seg = ShmSegment::create(&name, 8).unwrap();
        assert!(matches!(
            ShmSegment::open(&name, 64),
            Err(ShmError::SizeMismatch { expected: 64, .. })
        ));
        ShmSegment::unlink(&name).unwrap();
        assert!(ShmSegment::unlink(&name).is_ok());
    }

    #[test]
    fn test_empty_segment() {
        let name = unique_name("empty");
        let seg = ShmSegment::create(&name, 0).unwrap();
        assert!(seg.bytes(0).is_empty());
        let opened = ShmSegment::open(&name, 0).unwrap();
        assert!(opened.bytes(0).is_empty());
        ShmSegment::unlink(&name).unwrap();
    }
}
