//! Lifecycle management for installer child processes
//!
//! Installers (`brew`, `rbenv install`, `gem`, download scripts) can run for
//! minutes and spawn their own children. If devsetup is interrupted, those
//! trees must not keep running unattended.
//!
//! - Every command is spawned as the leader of its own process group
//! - Running groups are tracked in a global registry
//! - On SIGINT/SIGTERM/SIGHUP each group gets SIGTERM, a grace period,
//!   then SIGKILL

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Running installer process groups, keyed by leader PID
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// PID -> command label for log output
    children: HashMap<u32, String>,
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// The process-wide registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32, label: &str) {
        self.children.insert(pid, label.to_string());
        debug!("Tracking child {} ({})", pid, label);
    }

    pub fn unregister(&mut self, pid: u32) {
        if let Some(label) = self.children.remove(&pid) {
            debug!("Child {} ({}) finished", pid, label);
        }
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// SIGTERM every tracked group, wait up to `grace_period`, then SIGKILL
    /// whatever is left. Runs at most once per registry.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            return;
        }
        self.cleanup_initiated = true;

        if self.children.is_empty() {
            return;
        }

        info!("Stopping {} running installer(s)", self.children.len());
        let pids: Vec<u32> = self.children.keys().copied().collect();

        for &pid in &pids {
            if let Err(e) = signal_group(pid, Signal::SIGTERM) {
                debug!("Group signal to {} failed ({}), signalling the leader", pid, e);
                let _ = signal_process(pid, Signal::SIGTERM);
            }
        }

        let deadline = Instant::now() + grace_period;
        while Instant::now() < deadline {
            if pids.iter().all(|&pid| !is_alive(pid)) {
                self.children.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if is_alive(pid) {
                if let Some(label) = self.children.get(&pid) {
                    warn!("{} ({}) ignored SIGTERM, killing it", label, pid);
                }
                if signal_group(pid, Signal::SIGKILL).is_err() {
                    let _ = signal_process(pid, Signal::SIGKILL);
                }
            }
        }
        self.children.clear();
    }
}

fn signal_process(pid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), sig)
}

/// Negative PID addresses the whole process group
fn signal_group(pgid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), sig)
}

fn is_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP that stop every tracked
/// installer and exit with `128 + signal`. Call once at start-up.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "signal",
            };
            info!("Received {}, stopping installers", name);

            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait that starts a `Command` in a fresh process group
pub trait CommandProcessGroup {
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // PGID = child PID, so the whole installer tree can be signalled at once
        self.process_group(0)
    }
}
