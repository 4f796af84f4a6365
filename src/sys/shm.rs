// Shared memory backend abstraction for Linux
// Uses /dev/shm files + mmap so independent processes can map one queue

use std::fmt::Debug;
use std::io;
use std::ptr::NonNull;

/// Memory region backing a queue. Implementations own the mapping and
/// release it on drop; they never unlink the underlying name.
pub trait ShmBackend: Send + Sync + Debug {
    /// Get a pointer to the start of the region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the region in bytes
    fn size(&self) -> usize;

    /// Get the underlying platform handle
    fn raw_handle(&self) -> RawHandle;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy)]
pub enum RawHandle {
    /// Unix file descriptor (Linux)
    Fd(i32),
    /// Process-private heap allocation, no OS handle
    Heap,
}

/// Create a new named shared memory segment of the given size.
///
/// The segment is a file under `/dev/shm`, so other processes can map
/// the same region by name with [`attach_segment`]. The fresh mapping
/// is zero-filled by the kernel.
#[cfg(target_os = "linux")]
pub fn create_segment(name: &str, size: usize) -> io::Result<Box<dyn ShmBackend>> {
    Ok(Box::new(MmapSegment::create(name, size)?))
}

/// Attach to an existing named segment, mapping the whole file.
///
/// Fails with `NotFound` if no segment of that name exists and with
/// `InvalidData` if the file is smaller than `min_size`.
#[cfg(target_os = "linux")]
pub fn attach_segment(name: &str, min_size: usize) -> io::Result<Box<dyn ShmBackend>> {
    Ok(Box::new(MmapSegment::attach(name, min_size)?))
}

/// Remove a named segment. Existing mappings stay valid until dropped.
#[cfg(target_os = "linux")]
pub fn unlink_segment(name: &str) -> io::Result<()> {
    std::fs::remove_file(shm_path(name))
}

#[cfg(not(target_os = "linux"))]
pub fn create_segment(_name: &str, _size: usize) -> io::Result<Box<dyn ShmBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Named shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn attach_segment(_name: &str, _min_size: usize) -> io::Result<Box<dyn ShmBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Named shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn unlink_segment(_name: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Named shared memory only supported on Linux",
    ))
}

/// Allocate a process-private region with the same interface.
///
/// Used when the workers are threads of one process rather than
/// separate processes; the futex words inside work the same way.
pub fn heap_segment(size: usize) -> io::Result<Box<dyn ShmBackend>> {
    Ok(Box::new(HeapSegment::create(size)?))
}

#[cfg(target_os = "linux")]
fn shm_path(name: &str) -> String {
    format!("/dev/shm/{}", name)
}

#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct MmapSegment {
    ptr: NonNull<u8>,
    size: usize,
    fd: i32,
}

#[cfg(target_os = "linux")]
unsafe impl Send for MmapSegment {}
#[cfg(target_os = "linux")]
unsafe impl Sync for MmapSegment {}

#[cfg(target_os = "linux")]
impl MmapSegment {
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        use std::fs::OpenOptions;
        use std::os::fd::IntoRawFd;
        use std::os::unix::fs::OpenOptionsExt;

        let path = shm_path(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("Failed to create shared memory file at {}: {}", path, e),
                )
            })?;

        let fd = file.into_raw_fd();

        if unsafe { libc::ftruncate(fd, size as i64) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        let ptr = Self::map(fd, size)?;
        Ok(Self { ptr, size, fd })
    }

    pub fn attach(name: &str, min_size: usize) -> io::Result<Self> {
        use std::fs::OpenOptions;
        use std::os::fd::IntoRawFd;

        let path = shm_path(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Failed to open shared memory at {}: {}", path, e),
                )
            })?;

        let file_size = file.metadata()?.len() as usize;
        if file_size < min_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Shared memory segment too small: expected at least {} bytes, got {}",
                    min_size, file_size
                ),
            ));
        }

        let fd = file.into_raw_fd();
        let ptr = Self::map(fd, file_size)?;
        Ok(Self {
            ptr,
            size: file_size,
            fd,
        })
    }

    fn map(fd: i32, size: usize) -> io::Result<NonNull<u8>> {
        // mmap returns page-aligned memory, which satisfies every
        // alignment the queue header asks for.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        Ok(NonNull::new(ptr as *mut u8).expect("mmap returned a non-null mapping"))
    }
}

#[cfg(target_os = "linux")]
impl Drop for MmapSegment {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
            libc::close(self.fd);
        }
    }
}

#[cfg(target_os = "linux")]
impl ShmBackend for MmapSegment {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::Fd(self.fd)
    }
}

#[derive(Debug)]
pub struct HeapSegment {
    ptr: NonNull<u8>,
    layout: std::alloc::Layout,
}

unsafe impl Send for HeapSegment {}
unsafe impl Sync for HeapSegment {}

impl HeapSegment {
    pub fn create(size: usize) -> io::Result<Self> {
        let layout = std::alloc::Layout::from_size_align(size, 128).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Bad region size {}: {}", size, e),
            )
        })?;

        let raw = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::OutOfMemory,
                format!("Failed to allocate {} byte region", size),
            )
        })?;

        Ok(Self { ptr, layout })
    }
}

impl Drop for HeapSegment {
    fn drop(&mut self) {
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl ShmBackend for HeapSegment {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.layout.size()
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::Heap
    }
}
