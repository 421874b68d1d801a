//! Locating the user's shell

use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{getuid, User};

pub const FALLBACK_SHELL: &str = "/bin/sh";
const SHELLS_FILE: &str = "/etc/shells";

/// Turn a shell name into a path.
///
/// Absolute paths are kept as given and `.`-relative ones canonicalized;
/// otherwise `PATH` is searched, then `$SHELL`, then the passwd entry,
/// then [`FALLBACK_SHELL`].
pub fn resolve(program: &str) -> PathBuf {
    let passwd_shell = User::from_uid(getuid()).ok().flatten().map(|user| user.shell);
    resolve_with(
        program,
        std::env::var_os("PATH").as_deref(),
        std::env::var_os("SHELL").as_deref(),
        passwd_shell.as_deref(),
    )
}

fn resolve_with(
    program: &str,
    path_var: Option<&OsStr>,
    shell_var: Option<&OsStr>,
    passwd_shell: Option<&Path>,
) -> PathBuf {
    if program.starts_with('/') {
        return PathBuf::from(program);
    }
    if program.starts_with('.') {
        if let Ok(resolved) = fs::canonicalize(program) {
            return resolved;
        }
    }
    if let Some(path_var) = path_var {
        for dir in std::env::split_paths(path_var) {
            if let Ok(resolved) = fs::canonicalize(dir.join(program)) {
                return resolved;
            }
        }
    }
    if let Some(shell) = shell_var.map(Path::new).filter(|p| is_executable(p)) {
        return shell.to_path_buf();
    }
    if let Some(shell) = passwd_shell.filter(|p| is_executable(p)) {
        return shell.to_path_buf();
    }
    log::debug!("could not resolve shell {:?}, using {}", program, FALLBACK_SHELL);
    PathBuf::from(FALLBACK_SHELL)
}

/// Executable by "other", matching what login(1) accepts
fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o001 != 0)
        .unwrap_or(false)
}

/// Whether `shell` is one of the permitted login shells in /etc/shells
pub fn is_listed(shell: &Path) -> bool {
    match fs::read_to_string(SHELLS_FILE) {
        Ok(contents) => listed_in(&contents, shell),
        Err(e) => {
            log::debug!("cannot read {}: {}", SHELLS_FILE, e);
            false
        }
    }
}

fn listed_in(contents: &str, shell: &Path) -> bool {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| Path::new(line) == shell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn make_executable(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_absolute_path_is_kept() {
        assert_eq!(resolve_with("/no/such/shell", None, None, None), PathBuf::from("/no/such/shell"));
    }

    #[test]
    fn test_path_search() {
        let dir = tempfile::tempdir().unwrap();
        let shell = make_executable(dir.path(), "kestrel-test-sh", 0o755);
        let path_var = std::env::join_paths(["/nonexistent", dir.path().to_str().unwrap()]).unwrap();
        let resolved = resolve_with("kestrel-test-sh", Some(&path_var), None, None);
        assert_eq!(resolved, fs::canonicalize(shell).unwrap());
    }

    #[test]
    fn test_falls_back_to_shell_var() {
        let dir = tempfile::tempdir().unwrap();
        let shell = make_executable(dir.path(), "mysh", 0o755);
        let resolved = resolve_with("missing-shell", None, Some(shell.as_os_str()), None);
        assert_eq!(resolved, shell);
    }

    #[test]
    fn test_skips_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        let private = make_executable(dir.path(), "private", 0o700);
        let passwd = make_executable(dir.path(), "passwd-sh", 0o755);
        let resolved = resolve_with("missing-shell", None, Some(private.as_os_str()), Some(&passwd));
        assert_eq!(resolved, passwd);
    }

    #[test]
    fn test_last_resort() {
        assert_eq!(resolve_with("missing-shell", None, None, None), PathBuf::from(FALLBACK_SHELL));
    }

    #[test]
    fn test_listed_in() {
        let contents = "# /etc/shells: valid login shells\n/bin/sh\n/bin/bash\n\n/usr/bin/zsh\n";
        assert!(listed_in(contents, Path::new("/bin/bash")));
        assert!(listed_in(contents, Path::new("/usr/bin/zsh")));
        assert!(!listed_in(contents, Path::new("/tmp/evil")));
        assert!(!listed_in(contents, Path::new("# /etc/shells: valid login shells")));
    }
}
