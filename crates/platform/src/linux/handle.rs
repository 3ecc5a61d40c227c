//! File handles via `name_to_handle_at(2)` and `open_by_handle_at(2)`.
//!
//! The kernel's `struct file_handle` is an 8-byte header (`handle_bytes`,
//! `handle_type`) followed by `handle_bytes` opaque bytes. Buffers are built
//! and parsed byte-wise so no Rust reference to the C layout is ever formed.

use crate::traits::{OpenedObject, PathResolver, ReferenceOpener};
use libc::c_int;
use stalefh_core::{AccessMode, FilesystemToken, ObjectIndex, ObjectReference, ReopenError};
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;

/// Initial handle capacity, `MAX_HANDLE_SZ` in the kernel headers.
pub const MAX_HANDLE_SZ: usize = 128;

/// Size of the `struct file_handle` header.
const HEADER_LEN: usize = 8;

/// Raw handle returned by `name_to_handle_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHandle {
    /// `handle_type` reported by the filesystem
    pub handle_type: i32,
    /// Mount identifier of the filesystem holding the path
    pub mount_id: i32,
    /// Opaque handle bytes
    pub bytes: Vec<u8>,
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path contains an interior NUL byte: {}", path.display()),
        )
    })
}

fn read_word(buf: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    word
}

/// Resolve `path` to a file handle.
///
/// Starts with [`MAX_HANDLE_SZ`] bytes of room and grows the buffer when the
/// filesystem reports `EOVERFLOW` with a larger required size, so handles
/// are never truncated.
pub fn name_to_handle(path: &Path) -> io::Result<RawHandle> {
    name_to_handle_with(path, MAX_HANDLE_SZ)
}

/// [`name_to_handle`] starting from `initial` bytes of handle room.
///
/// An `EOVERFLOW` that does not ask for more room than was offered is
/// returned as an error rather than retried.
fn name_to_handle_with(path: &Path, initial: usize) -> io::Result<RawHandle> {
    let path = c_path(path)?;
    let mut capacity = initial;

    loop {
        let advertised = u32::try_from(capacity)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "handle size overflow"))?;
        let mut buf = vec![0u8; HEADER_LEN + capacity];
        buf[..4].copy_from_slice(&advertised.to_ne_bytes());
        let mut mount_id: c_int = 0;

        // SAFETY: `path` is NUL-terminated and outlives the call; `buf` holds
        // the 8-byte header plus `capacity` bytes, matching the advertised
        // `handle_bytes`; `mount_id` is a valid out-pointer.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_name_to_handle_at,
                libc::AT_FDCWD,
                path.as_ptr(),
                buf.as_mut_ptr(),
                &mut mount_id as *mut c_int,
                0 as c_int,
            )
        };

        let reported = u32::from_ne_bytes(read_word(&buf, 0)) as usize;
        if rc == 0 {
            let handle_type = i32::from_ne_bytes(read_word(&buf, 4));
            let mut bytes = buf.split_off(HEADER_LEN);
            bytes.truncate(reported);
            return Ok(RawHandle {
                handle_type,
                mount_id,
                bytes,
            });
        }

        let err = io::Error::last_os_error();
        match grown_capacity(&err, reported, capacity) {
            Some(required) => {
                debug!(
                    target: "stalefh::platform",
                    required,
                    capacity,
                    "Growing file handle buffer"
                );
                capacity = required;
            }
            None => return Err(err),
        }
    }
}

/// Capacity to retry with after a failed `name_to_handle_at`, if any.
fn grown_capacity(err: &io::Error, reported: usize, capacity: usize) -> Option<usize> {
    (err.raw_os_error() == Some(libc::EOVERFLOW) && reported > capacity).then_some(reported)
}

/// Open the object named by a file handle on the mount of `mount`.
pub fn open_by_handle(
    mount: &File,
    handle_type: i32,
    bytes: &[u8],
    flags: c_int,
) -> io::Result<OwnedFd> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "handle too large"))?;
    let mut buf = Vec::with_capacity(HEADER_LEN + bytes.len());
    buf.extend_from_slice(&len.to_ne_bytes());
    buf.extend_from_slice(&handle_type.to_ne_bytes());
    buf.extend_from_slice(bytes);

    // SAFETY: `buf` is a complete `struct file_handle` whose `handle_bytes`
    // equals the number of trailing bytes; `mount` is an open descriptor.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_open_by_handle_at,
            mount.as_raw_fd(),
            buf.as_mut_ptr(),
            flags | libc::O_CLOEXEC,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    let fd = RawFd::try_from(rc)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "descriptor out of range"))?;
    // SAFETY: the kernel returned a fresh descriptor that nothing else owns.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Map a reopen failure to the classification the harness expects.
pub fn reopen_error(err: io::Error) -> ReopenError {
    match err.raw_os_error() {
        Some(libc::ENOENT) => ReopenError::NotFound,
        Some(libc::ESTALE) => ReopenError::Stale,
        _ => ReopenError::Other(err),
    }
}

fn access_flags(access: AccessMode) -> c_int {
    match access {
        AccessMode::ReadOnly => libc::O_RDONLY,
        AccessMode::ReadWrite => libc::O_RDWR,
    }
}

/// [`PathResolver`] backed by `name_to_handle_at(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleResolver;

impl PathResolver for HandleResolver {
    fn resolve_filesystem(&self, dir: &Path) -> io::Result<FilesystemToken> {
        let handle = name_to_handle(dir)?;
        let anchor = File::open(dir)?;
        Ok(FilesystemToken::new(dir, handle.mount_id, anchor))
    }

    fn resolve_object(&self, index: ObjectIndex, path: &Path) -> io::Result<ObjectReference> {
        let handle = name_to_handle(path)?;
        Ok(ObjectReference::new(
            index,
            handle.handle_type,
            handle.mount_id,
            handle.bytes,
        ))
    }
}

/// [`ReferenceOpener`] backed by `open_by_handle_at(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleOpener;

impl ReferenceOpener for HandleOpener {
    fn open_by_reference(
        &self,
        fs: &FilesystemToken,
        reference: &ObjectReference,
        access: AccessMode,
    ) -> Result<Box<dyn OpenedObject>, ReopenError> {
        open_by_handle(
            fs.anchor(),
            reference.handle_type(),
            reference.as_bytes(),
            access_flags(access),
        )
        .map(|fd| Box::new(FdObject(fd)) as Box<dyn OpenedObject>)
        .map_err(reopen_error)
    }
}

/// Descriptor returned by a successful reopen.
#[derive(Debug)]
struct FdObject(OwnedFd);

impl OpenedObject for FdObject {
    fn close(self: Box<Self>) -> io::Result<()> {
        let FdObject(owned) = *self;
        let fd = owned.into_raw_fd();
        // SAFETY: ownership of `fd` was released from the `OwnedFd` above,
        // so it is closed exactly once here.
        if unsafe { libc::close(fd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
