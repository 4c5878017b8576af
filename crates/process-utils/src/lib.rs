//! Small process-related helpers shared across the workspace.
//!
//! Notifiers that shell out to external binaries use these to locate the
//! binary up front and to launch it without tying the caller to the child's
//! lifetime.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

/// Locate `program` the way a shell would.
///
/// Anything containing a path separator is checked as-is; bare names are
/// searched for in `PATH` (with `.exe` appended on Windows).
pub fn find_program(program: impl AsRef<OsStr>) -> Option<PathBuf> {
    let program = Path::new(program.as_ref());
    if program.as_os_str().is_empty() {
        return None;
    }

    if program.components().count() > 1 || program.is_absolute() {
        return is_executable(program).then(|| program.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| is_executable(candidate))
}

fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    let direct = dir.join(program);
    if cfg!(windows) && program.extension().is_none() {
        vec![direct.with_extension("exe"), direct]
    } else {
        vec![direct]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Spawn `cmd` with null stdio and reap it in the background.
///
/// Returns once the process has started. `on_exit` runs with the exit status
/// (or the wait error) when the child terminates. Must be called from within
/// a Tokio runtime.
#[cfg(feature = "tokio")]
pub fn spawn_detached<F>(
    cmd: &mut tokio::process::Command,
    on_exit: F,
) -> std::io::Result<Option<u32>>
where
    F: FnOnce(std::io::Result<std::process::ExitStatus>) + Send + 'static,
{
    use std::process::Stdio;

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let pid = child.id();

    tokio::spawn(async move {
        on_exit(child.wait().await);
    });

    Ok(pid)
}
