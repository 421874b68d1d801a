//! PTY master/slave pair
//!
//! On Linux the master comes from posix_openpt(). On macOS the master is not
//! usable for ioctl(TIOCSWINSZ) until the slave is open, so openpty() is used
//! and the slave descriptor is held for the lifetime of the master.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
#[cfg(target_os = "macos")]
use nix::pty::openpty;
#[cfg(target_os = "linux")]
use nix::pty::{grantpt, posix_openpt, ptsname_r, unlockpt};
use nix::sys::termios::{self, InputFlags, SetArg, SpecialCharacterIndices};

use crate::error::{Error, Result};
use crate::size::WindowSize;

pub struct Pty {
    master: File,
    slave_path: String,
    #[cfg(target_os = "macos")]
    _slave: OwnedFd,
}

impl Pty {
    #[cfg(target_os = "linux")]
    pub fn new() -> Result<Self> {
        use std::os::fd::IntoRawFd;

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY)?;
        grantpt(&master)?;
        unlockpt(&master)?;
        let slave_path = ptsname_r(&master)?;
        // SAFETY: into_raw_fd hands over sole ownership of the descriptor
        let master = unsafe { File::from_raw_fd(master.into_raw_fd()) };
        Ok(Self { master, slave_path })
    }

    #[cfg(target_os = "macos")]
    pub fn new() -> Result<Self> {
        let pair = openpty(None, None)?;
        // SAFETY: ttyname returns a pointer into static storage or null
        let slave_path = unsafe {
            let name = libc::ttyname(pair.slave.as_raw_fd());
            if name.is_null() {
                return Err(Error::PtyCreation("slave has no tty name".to_string()));
            }
            std::ffi::CStr::from_ptr(name).to_string_lossy().into_owned()
        };
        Ok(Self {
            master: File::from(pair.master),
            slave_path,
            _slave: pair.slave,
        })
    }

    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        let fd = self.master.as_raw_fd();
        let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
        let flags = if nonblocking {
            flags | OFlag::O_NONBLOCK
        } else {
            flags & !OFlag::O_NONBLOCK
        };
        fcntl(fd, FcntlArg::F_SETFL(flags))?;
        Ok(())
    }

    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let ws = size.to_winsize();
        // SAFETY: TIOCSWINSZ reads one winsize from the pointer
        let rc = unsafe {
            libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ as libc::c_ulong, &ws)
        };
        if rc == -1 {
            return Err(Error::WindowSize(io::Error::last_os_error().to_string()));
        }
        Ok(())
    }

    pub fn window_size(&self) -> Result<WindowSize> {
        // SAFETY: winsize is plain old data
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::ioctl(self.master.as_raw_fd(), libc::TIOCGWINSZ as libc::c_ulong, &mut ws)
        };
        if rc == -1 {
            return Err(Error::WindowSize(io::Error::last_os_error().to_string()));
        }
        Ok(WindowSize::from(ws))
    }

    /// Read child output. Returns 0 at hang-up; `WouldBlock` when
    /// nonblocking and nothing is pending.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.master).read(buf)
    }

    /// Single write; the caller decides what a short count means
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (&self.master).write(buf)
    }
}

impl AsFd for Pty {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }
}

impl AsRawFd for Pty {
    fn as_raw_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }
}

pub(crate) fn open_slave(path: &str) -> Result<OwnedFd> {
    let path = CString::new(path).map_err(|e| Error::PtyCreation(e.to_string()))?;
    // SAFETY: path is NUL-terminated; ownership of a valid fd is taken below
    let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NOCTTY) };
    if fd < 0 {
        return Err(Error::PtyCreation(io::Error::last_os_error().to_string()));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Line discipline for the shell: the kernel defaults (cooked, echo) with
/// UTF-8 aware erase and DEL as the erase character.
pub(crate) fn configure_slave(fd: BorrowedFd<'_>) -> Result<()> {
    let mut attrs = termios::tcgetattr(fd)?;
    attrs.input_flags |= InputFlags::IUTF8;
    attrs.control_chars[SpecialCharacterIndices::VERASE as usize] = 0x7f;
    termios::tcsetattr(fd, SetArg::TCSANOW, &attrs)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_creation() {
        let pty = Pty::new().unwrap();
        #[cfg(target_os = "linux")]
        assert!(pty.slave_path().starts_with("/dev/pts/"));
        #[cfg(target_os = "macos")]
        assert!(pty.slave_path().starts_with("/dev/ttys"));
    }

    #[test]
    fn test_pty_window_size() {
        let pty = Pty::new().unwrap();
        pty.set_window_size(WindowSize::with_pixels(120, 40, 960, 640)).unwrap();
        let size = pty.window_size().unwrap();
        assert_eq!((size.cols, size.rows), (120, 40));
        assert_eq!((size.pixel_width, size.pixel_height), (960, 640));
    }

    #[test]
    fn test_slave_gets_iutf8() {
        let pty = Pty::new().unwrap();
        let slave = open_slave(pty.slave_path()).unwrap();
        configure_slave(slave.as_fd()).unwrap();
        let attrs = termios::tcgetattr(slave.as_fd()).unwrap();
        assert!(attrs.input_flags.contains(InputFlags::IUTF8));
    }

    #[test]
    fn test_pty_nonblocking_read() {
        let pty = Pty::new().unwrap();
        let _slave = open_slave(pty.slave_path()).unwrap();
        pty.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 16];
        let err = pty.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }
}
