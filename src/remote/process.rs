//! Capability to read and write another process's memory

use std::sync::Arc;

use crate::error::Result;

use super::maps::MemoryRange;

/// Foreign memory access capability
///
/// Implementations enumerate the target's mapped ranges and copy bytes in
/// and out of them. Addresses are plain integers in the target's address
/// space.
pub trait ProcessMemory {
    /// Process the capability is bound to
    fn pid(&self) -> i32;

    /// Readable ranges of the target (only writable ones if `writeable_only`)
    fn mapped_ranges(&self, writeable_only: bool) -> Result<Vec<MemoryRange>>;

    /// Fill `buf` with the bytes starting at `address`
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `address`
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;
}

impl<T: ProcessMemory + ?Sized> ProcessMemory for &T {
    fn pid(&self) -> i32 {
        (**self).pid()
    }

    fn mapped_ranges(&self, writeable_only: bool) -> Result<Vec<MemoryRange>> {
        (**self).mapped_ranges(writeable_only)
    }

    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(address, buf)
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        (**self).write_bytes(address, data)
    }
}

impl<T: ProcessMemory + ?Sized> ProcessMemory for Arc<T> {
    fn pid(&self) -> i32 {
        (**self).pid()
    }

    fn mapped_ranges(&self, writeable_only: bool) -> Result<Vec<MemoryRange>> {
        (**self).mapped_ranges(writeable_only)
    }

    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(address, buf)
    }

    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        (**self).write_bytes(address, data)
    }
}

#[cfg(target_os = "linux")]
pub use linux::{AccessMethod, ProcMemory};

#[cfg(target_os = "linux")]
mod linux {
    use std::{
        fs::{File, OpenOptions},
        io::{IoSlice, IoSliceMut},
        os::unix::fs::FileExt,
        path::PathBuf,
    };

    use log::debug;
    use nix::{
        errno::Errno,
        sys::{
            signal::kill,
            uio::{process_vm_readv, process_vm_writev, RemoteIoVec},
        },
        unistd::Pid,
    };
    use serde::{Deserialize, Serialize};

    use super::ProcessMemory;
    use crate::{
        error::{MemFrameError, Result},
        remote::maps::{parse_maps, MemoryRange},
    };

    /// How bytes are moved in and out of the target
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AccessMethod {
        /// Positioned reads/writes on `/proc/<pid>/mem`
        ProcMem,
        /// `process_vm_readv` / `process_vm_writev`
        VmReadv,
    }

    impl Default for AccessMethod {
        fn default() -> Self {
            Self::ProcMem
        }
    }

    /// Memory access to a live Linux process
    ///
    /// Requires ptrace-level access to the target (same user and a
    /// permissive `ptrace_scope`, or `CAP_SYS_PTRACE`).
    #[derive(Debug)]
    pub struct ProcMemory {
        pid: Pid,
        method: AccessMethod,
        mem: Option<File>,
        writable: bool,
    }

    /// Interpret the result of sending the null signal to `pid`
    ///
    /// `EPERM` means the process exists but we may not signal it; opening
    /// its memory may still be allowed (e.g. with only `CAP_SYS_PTRACE`).
    pub(super) fn check_alive(pid: i32, signal_result: nix::Result<()>) -> Result<()> {
        match signal_result {
            Ok(()) | Err(Errno::EPERM) => Ok(()),
            Err(e) => Err(MemFrameError::process_unavailable(pid, e.to_string())),
        }
    }

    impl ProcMemory {
        /// Open the target process for memory access
        pub fn open(pid: i32, method: AccessMethod) -> Result<Self> {
            if pid <= 0 {
                return Err(MemFrameError::invalid_parameter("pid", "Pid must be positive"));
            }
            let nix_pid = Pid::from_raw(pid);
            check_alive(pid, kill(nix_pid, None))?;

            let (mem, writable) = match method {
                AccessMethod::ProcMem => {
                    let path = Self::proc_path(pid, "mem");
                    match OpenOptions::new().read(true).write(true).open(&path) {
                        Ok(file) => (Some(file), true),
                        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                            debug!("{} not writable, opening read-only", path.display());
                            let file = File::open(&path).map_err(|e| {
                                MemFrameError::process_unavailable(pid, e.to_string())
                            })?;
                            (Some(file), false)
                        }
                        Err(e) => return Err(MemFrameError::process_unavailable(pid, e.to_string())),
                    }
                }
                AccessMethod::VmReadv => (None, true),
            };

            debug!("Opened pid {} for memory access via {:?}", pid, method);
            Ok(Self {
                pid: nix_pid,
                method,
                mem,
                writable,
            })
        }

        /// Open our own process; used for self-inspection and tests
        pub fn open_self(method: AccessMethod) -> Result<Self> {
            Self::open(std::process::id() as i32, method)
        }

        pub fn method(&self) -> AccessMethod {
            self.method
        }

        fn proc_path(pid: i32, entry: &str) -> PathBuf {
            PathBuf::from(format!("/proc/{}/{}", pid, entry))
        }

        fn mem_file(&self) -> Result<&File> {
            self.mem
                .as_ref()
                .ok_or_else(|| MemFrameError::platform("/proc mem file not open"))
        }

        fn remote_iov(address: u64, len: usize) -> Result<RemoteIoVec> {
            let base = usize::try_from(address).map_err(|_| {
                MemFrameError::invalid_parameter("address", "Address exceeds pointer width")
            })?;
            Ok(RemoteIoVec { base, len })
        }
    }

    impl ProcessMemory for ProcMemory {
        fn pid(&self) -> i32 {
            self.pid.as_raw()
        }

        fn mapped_ranges(&self, writeable_only: bool) -> Result<Vec<MemoryRange>> {
            let path = Self::proc_path(self.pid(), "maps");
            let text = std::fs::read_to_string(&path)
                .map_err(|e| MemFrameError::from_io(e, "Failed to read process maps"))?;
            parse_maps(&text, writeable_only)
        }

        fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<()> {
            match self.method {
                AccessMethod::ProcMem => self
                    .mem_file()?
                    .read_exact_at(buf, address)
                    .map_err(|e| MemFrameError::from_io(e, "Failed to read process memory")),
                AccessMethod::VmReadv => {
                    let len = buf.len();
                    let remote = [Self::remote_iov(address, len)?];
                    let read = process_vm_readv(self.pid, &mut [IoSliceMut::new(buf)], &remote)?;
                    if read != len {
                        return Err(MemFrameError::platform(format!(
                            "Short read at {:#x}: {} of {} bytes",
                            address, read, len
                        )));
                    }
                    Ok(())
                }
            }
        }

        fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
            if !self.writable {
                return Err(MemFrameError::process_unavailable(
                    self.pid(),
                    "memory was opened read-only",
                ));
            }
            match self.method {
                AccessMethod::ProcMem => self
                    .mem_file()?
                    .write_all_at(data, address)
                    .map_err(|e| MemFrameError::from_io(e, "Failed to write process memory")),
                AccessMethod::VmReadv => {
                    let remote = [Self::remote_iov(address, data.len())?];
                    let written = process_vm_writev(self.pid, &[IoSlice::new(data)], &remote)?;
                    if written != data.len() {
                        return Err(MemFrameError::platform(format!(
                            "Short write at {:#x}: {} of {} bytes",
                            address,
                            written,
                            data.len()
                        )));
                    }
                    Ok(())
                }
            }
        }
    }
}
