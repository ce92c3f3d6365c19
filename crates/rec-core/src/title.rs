//! Active window title sources.
//!
//! The tracker asks a [`TitleSource`] for the focused window's title once per
//! poll. [`OsTitleSource`] asks the desktop through the platform's helper
//! tool; [`CommandTitleSource`] runs a user supplied command instead, which is
//! how Wayland users (or anyone with an unusual desktop) plug in their own
//! query.

use std::future::Future;
use std::io;
use std::process::{Output, Stdio};

use thiserror::Error;
use tokio::process::Command;

/// Title used when the active window cannot be determined.
pub const DESKTOP_TITLE: &str = "Desktop";

/// Errors querying the active window title.
#[derive(Debug, Error)]
pub enum TitleError {
    /// The query program could not be started.
    #[error("failed to run {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The query program exited unsuccessfully.
    #[error("title command exited with {status}: {stdout} {stderr}")]
    CommandFailed {
        status: String,
        stdout: String,
        stderr: String,
    },
}

/// Something that can report the title of the focused window.
pub trait TitleSource: Send + 'static {
    fn active_title(&mut self) -> impl Future<Output = Result<String, TitleError>> + Send;
}

/// Runs a shell command and uses its standard output as the title.
#[derive(Debug, Clone)]
pub struct CommandTitleSource {
    command: String,
}

impl CommandTitleSource {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TitleSource for CommandTitleSource {
    async fn active_title(&mut self) -> Result<String, TitleError> {
        let mut cmd = shell_command(&self.command);
        run(&mut cmd, &self.command).await
    }
}

/// Queries the desktop for the focused window's title.
///
/// Uses `xdotool` on X11 desktops, `osascript` on macOS and `PowerShell` on
/// Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTitleSource;

impl TitleSource for OsTitleSource {
    async fn active_title(&mut self) -> Result<String, TitleError> {
        let (program, args) = ACTIVE_WINDOW_QUERY;
        let mut cmd = Command::new(program);
        cmd.args(args);
        run(&mut cmd, program).await
    }
}

/// The title source chosen by configuration: a user command if one is set,
/// otherwise the desktop query.
#[derive(Debug, Clone)]
pub enum ActiveTitleSource {
    Os(OsTitleSource),
    Command(CommandTitleSource),
}

impl ActiveTitleSource {
    pub fn from_command(command: Option<&str>) -> Self {
        match command.map(str::trim).filter(|command| !command.is_empty()) {
            Some(command) => Self::Command(CommandTitleSource::new(command)),
            None => Self::Os(OsTitleSource),
        }
    }
}

impl TitleSource for ActiveTitleSource {
    async fn active_title(&mut self) -> Result<String, TitleError> {
        match self {
            Self::Os(source) => source.active_title().await,
            Self::Command(source) => source.active_title().await,
        }
    }
}

#[cfg(target_os = "macos")]
const ACTIVE_WINDOW_QUERY: (&str, &[&str]) = (
    "osascript",
    &[
        "-e",
        r#"tell application "System Events" to tell (first application process whose frontmost is true) to get name of front window"#,
    ],
);

#[cfg(windows)]
const ACTIVE_WINDOW_QUERY: (&str, &[&str]) = (
    "powershell",
    &[
        "-NoProfile",
        "-Command",
        r#"Add-Type -Namespace W -Name U -MemberDefinition '[DllImport("user32.dll")] public static extern System.IntPtr GetForegroundWindow(); [DllImport("user32.dll", CharSet = CharSet.Unicode)] public static extern int GetWindowText(System.IntPtr h, System.Text.StringBuilder s, int n);'; $s = New-Object System.Text.StringBuilder 1024; [void][W.U]::GetWindowText([W.U]::GetForegroundWindow(), $s, 1024); $s.ToString()"#,
    ],
);

#[cfg(not(any(target_os = "macos", windows)))]
const ACTIVE_WINDOW_QUERY: (&str, &[&str]) = ("xdotool", &["getactivewindow", "getwindowname"]);

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

async fn run(cmd: &mut Command, program: &str) -> Result<String, TitleError> {
    let output = cmd
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| TitleError::Spawn {
            program: program.to_string(),
            source,
        })?;
    title_from_output(&output)
}

fn title_from_output(output: &Output) -> Result<String, TitleError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        return Err(TitleError::CommandFailed {
            status: output.status.to_string(),
            stdout: stdout.trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
}
