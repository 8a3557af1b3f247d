//! Frame region living in our own address space

use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    os::fd::{AsRawFd, OwnedFd},
    os::unix::fs::OpenOptionsExt,
    ptr::NonNull,
    sync::atomic::{AtomicU8, Ordering},
    time::SystemTime,
};

use log::debug;
use memmap2::{MmapMut, MmapOptions};
#[cfg(target_os = "linux")]
use nix::{
    sys::memfd::{memfd_create, MemFdCreateFlag},
    unistd::ftruncate,
};

use crate::{
    error::{MemFrameError, Result},
    ownership::Ownership,
    region_layout::{RegionLayout, MAGIC_SIZE, OWNERSHIP_OFFSET},
    remote::RemoteHandle,
};

use super::config::{BackingType, RegionConfig};

/// A frame region mapped into this process
///
/// The region is created once by the side that owns the memory (the
/// consumer) and lives until it is dropped. Other processes reach it by
/// scanning for its markers; inside this process it is shared through
/// `Arc<SharedRegion>`.
///
/// Access rules follow the ownership byte: payload writes are only made by
/// the holder of [`Ownership::ProducerOwned`], payload reads only by the
/// holder of [`Ownership::ConsumerOwned`]. The region itself does not
/// enforce them; [`crate::protocol::Producer`] and
/// [`crate::protocol::Consumer`] do.
#[derive(Debug)]
pub struct SharedRegion {
    name: String,
    layout: RegionLayout,
    backing_type: BackingType,
    created_at: SystemTime,
    /// Base of the mapping, taken from `mmap` once at construction
    base: NonNull<u8>,
    mmap: MmapMut,
    _file: Option<File>,
    _owned_fd: Option<OwnedFd>,
}

impl SharedRegion {
    /// Allocate a region and initialize markers and ownership
    pub fn create(config: RegionConfig) -> Result<Self> {
        config.validate()?;
        let layout = config.layout()?;
        let size = layout.total_size();

        let (file, owned_fd, mmap) = match config.backing_type {
            BackingType::Anonymous => {
                let mmap = MmapOptions::new()
                    .len(size)
                    .map_anon()
                    .map_err(|e| MemFrameError::from_io(e, "Failed to create anonymous mapping"))?;
                (None, None, mmap)
            }
            BackingType::FileBacked => {
                let file = Self::open_file(&config, true)?;
                let mmap = Self::map_file(&file, size)?;
                (Some(file), None, mmap)
            }
            #[cfg(target_os = "linux")]
            BackingType::MemFd => {
                let owned_fd = Self::create_memfd(&config.name, size)?;
                let mmap = unsafe {
                    MmapOptions::new()
                        .len(size)
                        .map_mut(&owned_fd)
                        .map_err(|e| MemFrameError::from_io(e, "Failed to create memfd mapping"))?
                };
                (None, Some(owned_fd), mmap)
            }
        };

        let mut region = Self::from_parts(config, layout, file, owned_fd, mmap)?;
        layout.initialize(&mut region.mmap)?;

        debug!(
            "Created region '{}' ({}x{}, {} bytes, {}) at {:#x}",
            region.name,
            layout.width(),
            layout.height(),
            size,
            region.backing_type.name(),
            region.base_address()
        );
        Ok(region)
    }

    /// Map an existing file-backed region and validate its markers
    pub fn attach(config: RegionConfig) -> Result<Self> {
        config.validate()?;
        if config.backing_type != BackingType::FileBacked {
            return Err(MemFrameError::invalid_parameter(
                "backing_type",
                "Only file-backed regions can be attached",
            ));
        }

        let layout = config.layout()?;
        let file = Self::open_file(&config, false)?;
        let len = file
            .metadata()
            .map_err(|e| MemFrameError::from_io(e, "Failed to stat region file"))?
            .len();
        if len != layout.total_size() as u64 {
            return Err(MemFrameError::invalid_parameter(
                "file_path",
                format!(
                    "Region file is {} bytes, layout needs {}",
                    len,
                    layout.total_size()
                ),
            ));
        }

        let mmap = Self::map_file(&file, layout.total_size())?;
        let region = Self::from_parts(config, layout, Some(file), None, mmap)?;
        layout.verify_markers(&region.mmap)?;
        Ownership::from_byte(region.ownership_byte())?;
        Ok(region)
    }

    fn from_parts(
        config: RegionConfig,
        layout: RegionLayout,
        file: Option<File>,
        owned_fd: Option<OwnedFd>,
        mut mmap: MmapMut,
    ) -> Result<Self> {
        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| MemFrameError::platform("Mapping returned a null pointer"))?;

        Ok(Self {
            name: config.name,
            layout,
            backing_type: config.backing_type,
            created_at: SystemTime::now(),
            base,
            mmap,
            _file: file,
            _owned_fd: owned_fd,
        })
    }

    fn open_file(config: &RegionConfig, create: bool) -> Result<File> {
        let path = config.default_file_path();

        if create {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .mode(config.permissions)
                .open(&path)
                .map_err(|e| MemFrameError::from_io(e, "Failed to create/open region file"))?;
            file.set_len(config.layout()?.total_size() as u64)
                .map_err(|e| MemFrameError::from_io(e, "Failed to set region file size"))?;
            Ok(file)
        } else {
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| MemFrameError::from_io(e, "Failed to open existing region file"))
        }
    }

    fn map_file(file: &File, size: usize) -> Result<MmapMut> {
        unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(file)
                .map_err(|e| MemFrameError::from_io(e, "Failed to create file mapping"))
        }
    }

    #[cfg(target_os = "linux")]
    fn create_memfd(name: &str, size: usize) -> Result<OwnedFd> {
        let name_cstr = CString::new(name)
            .map_err(|_| MemFrameError::invalid_parameter("name", "Name contains null bytes"))?;

        let owned_fd = memfd_create(&name_cstr, MemFdCreateFlag::MFD_CLOEXEC)
            .map_err(|e| MemFrameError::platform(format!("Failed to create memfd: {}", e)))?;

        ftruncate(&owned_fd, size as i64)
            .map_err(|e| MemFrameError::platform(format!("Failed to set memfd size: {}", e)))?;

        debug!("memfd {} sized to {} bytes", owned_fd.as_raw_fd(), size);
        Ok(owned_fd)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    pub fn backing_type(&self) -> BackingType {
        self.backing_type
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Address of the first marker byte in this process
    pub fn base_address(&self) -> u64 {
        self.base.as_ptr() as usize as u64
    }

    /// Total region length in bytes
    pub fn len(&self) -> usize {
        self.layout.total_size()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Handle describing this region to a process that wants to reach it
    pub fn handle(&self) -> RemoteHandle {
        RemoteHandle::new(std::process::id() as i32, self.base_address(), self.len())
    }

    fn ownership_cell(&self) -> &AtomicU8 {
        // SAFETY: the mapping is at least `total_size()` bytes, lives as
        // long as `self`, and AtomicU8 has the same layout as u8.
        unsafe { &*(self.base.as_ptr().add(OWNERSHIP_OFFSET) as *const AtomicU8) }
    }

    /// Raw ownership byte (Acquire)
    pub fn ownership_byte(&self) -> u8 {
        self.ownership_cell().load(Ordering::Acquire)
    }

    /// Decoded ownership state
    pub fn ownership(&self) -> Result<Ownership> {
        Ownership::from_byte(self.ownership_byte())
    }

    /// Publish a new ownership state (Release)
    ///
    /// Every payload access made before this call is visible to a thread
    /// in this process that observes the new value.
    pub fn set_ownership(&self, state: Ownership) {
        self.ownership_cell().store(state.as_byte(), Ordering::Release);
    }

    /// Copy bytes out of the region at `offset`
    pub fn read_at(&self, offset: usize, out: &mut [u8]) -> Result<()> {
        self.check_bounds(offset, out.len())?;
        // SAFETY: bounds checked above; concurrent writers are excluded by
        // the ownership handshake, not by this method.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.base.as_ptr().add(offset),
                out.as_mut_ptr(),
                out.len(),
            );
        }
        Ok(())
    }

    /// Copy bytes into the region at `offset`
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<()> {
        self.check_bounds(offset, data.len())?;
        // SAFETY: see `read_at`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.base.as_ptr().add(offset),
                data.len(),
            );
        }
        Ok(())
    }

    /// Read the 4-byte marker at `offset`
    pub fn read_marker(&self, offset: usize) -> Result<[u8; MAGIC_SIZE]> {
        let mut bytes = [0u8; MAGIC_SIZE];
        self.read_at(offset, &mut bytes)?;
        Ok(bytes)
    }

    /// Copy of the whole region, markers included
    pub fn snapshot(&self) -> Vec<u8> {
        self.mmap[..self.len()].to_vec()
    }

    /// Flush changes to the backing file (no-op for anonymous mappings)
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| MemFrameError::from_io(e, "Failed to flush region mapping"))
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(MemFrameError::out_of_bounds(offset, len, self.len())),
        }
    }
}

unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}
