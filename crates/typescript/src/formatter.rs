//! Optional formatting of generated type definitions

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use log::{debug, warn};

/// Rewrites generated text before it is compared or written
pub trait Formatter: Send + Sync {
    fn format(&self, text: &str) -> String;
}

/// Leaves the text untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Formatter for Passthrough {
    fn format(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Formats with the `prettier` executable when one is on `PATH`
#[derive(Debug, Clone, Default)]
pub struct Prettier {
    executable: Option<PathBuf>,
}

impl Prettier {
    pub fn detect() -> Self {
        let executable = which::which("prettier").ok();
        match &executable {
            Some(path) => debug!("formatting with {}", path.display()),
            None => debug!("prettier not found, type definitions are written unformatted"),
        }
        Self { executable }
    }

    /// Use a specific executable instead of looking one up
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(executable.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.executable.is_some()
    }

    fn run(&self, text: &str) -> Option<String> {
        let executable = self.executable.as_ref()?;
        let mut child = Command::new(executable)
            .args(["--parser", "typescript"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .ok()?;

        if let Err(err) = feed(&mut child, text) {
            warn!("could not pipe type definitions to prettier: {}", err);
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }
        let output = child.wait_with_output().ok()?;

        if !output.status.success() {
            warn!("prettier failed: {}", String::from_utf8_lossy(&output.stderr).trim());
            return None;
        }
        String::from_utf8(output.stdout).ok()
    }
}

/// Write `text` to the child's stdin and close it
fn feed(child: &mut Child, text: &str) -> io::Result<()> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin not captured"))?;
    stdin.write_all(text.as_bytes())
}

impl Formatter for Prettier {
    fn format(&self, text: &str) -> String {
        self.run(text).unwrap_or_else(|| text.to_string())
    }
}
