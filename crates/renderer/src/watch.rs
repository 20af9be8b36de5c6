//! Re-renders when the shader source file changes on disk.

use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};

const DEBOUNCE: Duration = Duration::from_millis(200);
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

type NotifyResult = Result<notify::Event, notify::Error>;

/// Watches the directory holding the shader file and calls `on_change` once
/// per burst of writes to the file itself.
pub struct SourceWatcher {
    shutdown_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SourceWatcher {
    /// Starts watching `path`. `on_change` returns `false` once its receiver
    /// is gone, which ends the watch.
    ///
    /// Returns `None` if the file's directory cannot be watched.
    pub fn new<F>(path: &Path, on_change: F) -> Option<Self>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let file_name = path.file_name()?.to_os_string();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().ok()?,
        };
        if !parent.exists() {
            tracing::warn!(dir = %parent.display(), "source directory does not exist; not watching");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (notify_tx, notify_rx) = mpsc::channel();

        let mut watcher = match notify::recommended_watcher(notify_tx) {
            Ok(watcher) => watcher,
            Err(err) => {
                tracing::warn!(%err, "failed to create file watcher");
                return None;
            }
        };
        if let Err(err) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
            tracing::warn!(%err, dir = %parent.display(), "failed to watch source directory");
            return None;
        }
        tracing::debug!(path = %path.display(), "watching shader source");

        let thread = std::thread::Builder::new()
            .name("fragpad-watch".into())
            .spawn(move || {
                let _watcher = watcher;
                watch_loop(&file_name, &on_change, &notify_rx, &shutdown_rx);
            })
            .ok()?;

        Some(Self {
            shutdown_tx,
            thread: Some(thread),
        })
    }

    /// Stops the watch thread and waits for it; dropping does the same.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// A signal or a dropped sender both end the watch.
fn stop_requested(shutdown_rx: &mpsc::Receiver<()>) -> bool {
    !matches!(shutdown_rx.try_recv(), Err(mpsc::TryRecvError::Empty))
}

fn watch_loop(
    file_name: &OsString,
    on_change: &dyn Fn() -> bool,
    notify_rx: &mpsc::Receiver<NotifyResult>,
    shutdown_rx: &mpsc::Receiver<()>,
) {
    loop {
        if stop_requested(shutdown_rx) {
            return;
        }
        let event = match notify_rx.recv_timeout(SHUTDOWN_POLL) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        };

        let touches_source = match &event {
            Ok(event) => event
                .paths
                .iter()
                .any(|path| path.file_name() == Some(file_name.as_os_str())),
            Err(_) => false,
        };
        if !touches_source {
            continue;
        }

        while notify_rx.recv_timeout(DEBOUNCE).is_ok() {}

        if stop_requested(shutdown_rx) {
            return;
        }
        tracing::debug!("shader source changed");
        if !on_change() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Instant;

    use super::*;

    #[test]
    fn reports_writes_to_the_watched_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.glsl");
        fs::write(&path, "// v1").unwrap();

        let (tx, rx) = mpsc::channel();
        let watcher = SourceWatcher::new(&path, move || tx.send(()).is_ok()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = false;
        let mut revision = 2;
        while !seen && Instant::now() < deadline {
            fs::write(&path, format!("// v{revision}")).unwrap();
            revision += 1;
            seen = rx.recv_timeout(Duration::from_secs(1)).is_ok();
        }
        assert!(seen, "no change notification received");

        watcher.shutdown();
    }

    #[test]
    fn dropping_the_watcher_ends_its_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shader.glsl");
        fs::write(&path, "// v1").unwrap();

        let (tx, rx) = mpsc::channel();
        let watcher = SourceWatcher::new(&path, move || tx.send(()).is_ok()).unwrap();
        drop(watcher);

        // The callback, and with it the sender, went away with the thread.
        fs::write(&path, "// v2").unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }
}
