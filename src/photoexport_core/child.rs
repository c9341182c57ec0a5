//! Shared handle to the running exporter and the interrupt path that
//! terminates it.
//!
//! The slot is reserved before the child is spawned, so an interrupt that
//! lands mid-spawn is seen by the main thread when it registers the pid.
//! The main thread waits for the child to exit without reaping it, clears
//! the slot and only then reaps. Signals are sent under the lock `clear`
//! takes, so a published pid always names our child, alive or zombie.

use crate::photoexport_core::error::{INTERRUPT_EXIT_CODE, Result};
use std::io;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// How long a terminated child gets before it is killed.
pub const GRACE_PERIOD: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The process-wide slot for the exporter child.
pub static RUNNING_CHILD: ChildSlot = ChildSlot::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Spawning,
    Running,
    Terminating,
}

impl SupervisorState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SupervisorState::Spawning,
            2 => SupervisorState::Running,
            3 => SupervisorState::Terminating,
            _ => SupervisorState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SupervisorState::Idle => 0,
            SupervisorState::Spawning => 1,
            SupervisorState::Running => 2,
            SupervisorState::Terminating => 3,
        }
    }
}

/// How an interrupt was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    NoChild,
    Graceful,
    Forced,
}

#[derive(Debug)]
pub struct ChildSlot {
    pid: AtomicU32,
    state: AtomicU8,
    signal_lock: Mutex<()>,
}

impl ChildSlot {
    pub const fn new() -> Self {
        Self {
            pid: AtomicU32::new(0),
            state: AtomicU8::new(0),
            signal_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> SupervisorState {
        SupervisorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Claim the slot ahead of spawning. Idle -> Spawning.
    pub fn reserve(&self) {
        self.state
            .store(SupervisorState::Spawning.as_u8(), Ordering::SeqCst);
    }

    /// Publish a freshly spawned child. Spawning -> Running.
    ///
    /// Returns `false` when an interrupt arrived while spawning; the caller
    /// then owns stopping the child.
    pub fn register(&self, pid: u32) -> bool {
        let _guard = self.lock();
        let published = self
            .state
            .compare_exchange(
                SupervisorState::Spawning.as_u8(),
                SupervisorState::Running.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if published {
            self.pid.store(pid, Ordering::SeqCst);
        }
        published
    }

    /// Withdraw the child. Must happen before it is reaped. Returns the
    /// state it was in, so the caller can tell an interrupted run from a
    /// normal exit.
    pub fn clear(&self) -> SupervisorState {
        let _guard = self.lock();
        let previous = self.state.swap(SupervisorState::Idle.as_u8(), Ordering::SeqCst);
        self.pid.store(0, Ordering::SeqCst);
        SupervisorState::from_u8(previous)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.signal_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Running or Spawning -> Terminating. `false` when there is nothing to
    /// terminate.
    fn begin_termination(&self) -> bool {
        [SupervisorState::Running, SupervisorState::Spawning]
            .into_iter()
            .any(|from| {
                self.state
                    .compare_exchange(
                        from.as_u8(),
                        SupervisorState::Terminating.as_u8(),
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_ok()
            })
    }

    /// Send a signal to the published child, if any.
    fn send(&self, signal: fn(u32) -> io::Result<()>) -> Option<(u32, io::Result<()>)> {
        let _guard = self.lock();
        let pid = self.pid()?;
        Some((pid, signal(pid)))
    }

    /// Wait until the main thread has cleared the slot, up to `timeout`.
    fn wait_cleared(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state() != SupervisorState::Idle {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
        true
    }
}

impl Default for ChildSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminate the child in `slot`: SIGTERM, then SIGKILL after `grace`.
pub fn terminate(slot: &ChildSlot, grace: Duration) -> Termination {
    if !slot.begin_termination() {
        return Termination::NoChild;
    }

    match slot.send(sys::terminate) {
        Some((pid, Ok(()))) => log::info!("Terminating export process (pid {})...", pid),
        Some((pid, Err(e))) => log::warn!("Failed to send SIGTERM to {}: {}", pid, e),
        None => log::info!("Terminating export process while it starts..."),
    }

    if slot.wait_cleared(grace) {
        return Termination::Graceful;
    }

    log::warn!("Force killing export process...");
    if let Some((pid, Err(e))) = slot.send(sys::kill) {
        log::error!("Failed to send SIGKILL to {}: {}", pid, e);
    }
    Termination::Forced
}

/// Block until child `pid` has exited, leaving it unreaped.
pub fn wait_exited(pid: u32) -> io::Result<()> {
    sys::wait_exited(pid)
}

/// Route SIGINT/SIGTERM to [`terminate`] on the global slot, then exit 130.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        log::warn!("Received interrupt signal, cleaning up...");
        terminate(&RUNNING_CHILD, GRACE_PERIOD);
        log::info!("Cleanup complete");
        log::logger().flush();
        std::process::exit(i32::from(INTERRUPT_EXIT_CODE));
    })?;
    Ok(())
}

#[cfg(unix)]
mod sys {
    use std::io;

    fn send(pid: u32, sig: libc::c_int) -> io::Result<()> {
        let pid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, sig) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub fn terminate(pid: u32) -> io::Result<()> {
        send(pid, libc::SIGTERM)
    }

    pub fn kill(pid: u32) -> io::Result<()> {
        send(pid, libc::SIGKILL)
    }

    pub fn wait_exited(pid: u32) -> io::Result<()> {
        loop {
            // SAFETY: siginfo_t is plain data that waitid(2) fills in.
            let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
            let rc = unsafe {
                libc::waitid(
                    libc::P_PID,
                    pid as libc::id_t,
                    &mut info,
                    libc::WEXITED | libc::WNOWAIT,
                )
            };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use std::io;

    pub fn terminate(_pid: u32) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "signals are unix-only"))
    }

    pub fn kill(_pid: u32) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "signals are unix-only"))
    }

    pub fn wait_exited(_pid: u32) -> io::Result<()> {
        Ok(())
    }
}
