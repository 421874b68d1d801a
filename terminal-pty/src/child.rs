//! The shell process on the slave side of the PTY

use std::ffi::{CString, OsStr, OsString};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::ffi::OsStrExt;

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{dup2, execvp, fork, setsid, ForkResult, Pid};

use crate::error::{Error, Result};
use crate::pty::{configure_slave, open_slave, Pty};
use crate::size::WindowSize;

/// Terminal type advertised to the child
pub const TERM: &str = "xterm-256color";

/// Build the child's environment from `vars`: `TERM` is replaced, and
/// `SHELL` is dropped unless `keep_shell`.
pub fn child_environment<I, K, V>(vars: I, keep_shell: bool) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    let mut env: Vec<(OsString, OsString)> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(k, _)| k != "TERM" && (keep_shell || k != "SHELL"))
        .collect();
    env.push(("TERM".into(), TERM.into()));
    env
}

pub struct Child {
    pty: Pty,
    pid: Pid,
}

fn to_cstring(value: &OsStr, program: &str) -> Result<CString> {
    CString::new(value.as_bytes()).map_err(|e| Error::SpawnFailed {
        program: program.to_string(),
        reason: e.to_string(),
    })
}

impl Child {
    /// Fork and exec `argv[0]` (looked up in PATH) on a fresh PTY.
    ///
    /// The child becomes a session leader with the slave as its controlling
    /// terminal and stdio, and gets exactly `env` as its environment.
    pub fn spawn(argv: &[OsString], env: &[(OsString, OsString)], size: WindowSize) -> Result<Self> {
        let program = argv
            .first()
            .map(|p| p.to_string_lossy().into_owned())
            .ok_or_else(|| Error::SpawnFailed {
                program: String::new(),
                reason: "empty command line".to_string(),
            })?;

        let pty = Pty::new()?;
        pty.set_window_size(size)?;
        let slave_path = pty.slave_path().to_string();

        // Everything the child needs is allocated before the fork
        let args = argv
            .iter()
            .map(|a| to_cstring(a, &program))
            .collect::<Result<Vec<_>>>()?;
        let env = env
            .iter()
            .map(|(k, v)| {
                let mut pair = k.clone();
                pair.push("=");
                pair.push(v);
                to_cstring(&pair, &program)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("spawning {} on {}", program, slave_path);

        // SAFETY: the child only calls async-signal-safe functions before exec
        match unsafe { fork() }? {
            ForkResult::Parent { child } => Ok(Self { pty, pid: child }),
            ForkResult::Child => {
                if setsid().is_err() {
                    std::process::exit(1);
                }
                let slave = match open_slave(&slave_path) {
                    Ok(fd) => fd,
                    Err(_) => std::process::exit(1),
                };
                let raw = slave.as_raw_fd();
                // TIOCSCTTY is u32 on macOS; ioctl wants c_ulong
                if unsafe { libc::ioctl(raw, libc::TIOCSCTTY as libc::c_ulong, 0) } < 0 {
                    std::process::exit(1);
                }
                if configure_slave(slave.as_fd()).is_err() {
                    std::process::exit(1);
                }
                for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
                    if dup2(raw, target).is_err() {
                        std::process::exit(1);
                    }
                }
                if raw > 2 {
                    drop(slave);
                }

                #[cfg(target_os = "linux")]
                unsafe {
                    libc::clearenv();
                }
                #[cfg(not(target_os = "linux"))]
                for (key, _) in std::env::vars_os() {
                    std::env::remove_var(key);
                }
                for var in env {
                    // putenv keeps the pointer; leaking it is intended
                    unsafe {
                        libc::putenv(var.into_raw());
                    }
                }

                let _ = execvp(&args[0], &args);
                std::process::exit(127);
            }
        }
    }

    pub fn pty(&self) -> &Pty {
        &self.pty
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Exit status if the child has terminated
    pub fn try_wait(&self) -> Result<Option<WaitStatus>> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::StillAlive => Ok(None),
            status => Ok(Some(status)),
        }
    }

    pub fn signal(&self, signal: Signal) -> Result<()> {
        kill(self.pid, signal).map_err(Error::from)
    }

    /// Apply new geometry and tell the foreground job about it
    pub fn resize(&self, size: WindowSize) -> Result<()> {
        self.pty.set_window_size(size)?;
        if let Err(e) = self.signal(Signal::SIGWINCH) {
            log::debug!("SIGWINCH to {} failed: {}", self.pid, e);
        }
        Ok(())
    }

    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.pty.read(buf)
    }

    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.pty.write(buf)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.pty.set_nonblocking(nonblocking)
    }
}

impl AsFd for Child {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.pty.as_fd()
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        let _ = self.signal(Signal::SIGHUP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn argv(parts: &[&str]) -> Vec<OsString> {
        parts.iter().map(OsString::from).collect()
    }

    fn read_until(child: &Child, needle: &str) -> String {
        child.set_nonblocking(true).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut output = String::new();
        let mut buf = [0u8; 4096];
        while Instant::now() < deadline && !output.contains(needle) {
            match child.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => output.push_str(&String::from_utf8_lossy(&buf[..n])),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10))
                }
                // EIO once the child has exited and the slave is gone
                Err(_) => break,
            }
        }
        output
    }

    #[test]
    fn test_child_environment() {
        let vars = vec![("TERM", "dumb"), ("SHELL", "/bin/zsh"), ("HOME", "/home/k")];
        let env = child_environment(vars.clone(), false);
        assert!(env.contains(&("TERM".into(), TERM.into())));
        assert!(env.contains(&("HOME".into(), "/home/k".into())));
        assert!(!env.iter().any(|(k, _)| k == "SHELL"));
        assert_eq!(env.iter().filter(|(k, _)| k == "TERM").count(), 1);

        let env = child_environment(vars, true);
        assert!(env.iter().any(|(k, _)| k == "SHELL"));
    }

    #[test]
    fn test_spawn_echo() {
        let env = child_environment(std::env::vars_os(), true);
        let child = Child::spawn(&argv(&["echo", "hello"]), &env, WindowSize::default()).unwrap();
        assert!(read_until(&child, "hello").contains("hello"));
    }

    #[test]
    fn test_child_sees_term() {
        let env = child_environment(std::env::vars_os(), true);
        let child = Child::spawn(&argv(&["/bin/sh", "-c", "echo T=$TERM"]), &env, WindowSize::default())
            .unwrap();
        assert!(read_until(&child, "T=xterm-256color").contains("T=xterm-256color"));
    }

    #[test]
    fn test_resize() {
        let env = child_environment(std::env::vars_os(), true);
        let child = Child::spawn(&argv(&["/bin/sh"]), &env, WindowSize::default()).unwrap();
        child.resize(WindowSize::new(120, 40)).unwrap();
        let size = child.pty().window_size().unwrap();
        assert_eq!((size.cols, size.rows), (120, 40));
        let _ = child.signal(Signal::SIGTERM);
    }

    #[test]
    fn test_spawn_empty_argv() {
        let err = Child::spawn(&[], &[], WindowSize::default()).err().unwrap();
        assert!(matches!(err, Error::SpawnFailed { .. }));
    }
}
