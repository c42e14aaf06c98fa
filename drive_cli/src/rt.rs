//! Real-time scheduling helpers (Linux SCHED_FIFO / mlockall).

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }

    fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
        use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
        let flags = match lock {
            RtLock::None => return Ok(()),
            RtLock::Current => MCL_CURRENT,
            RtLock::All => MCL_CURRENT | MCL_FUTURE,
        };
        // SAFETY: mlockall takes flags only and touches no Rust-managed memory.
        let rc = unsafe { mlockall(flags) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        let mut msg = format!("mlockall({lock:?}) failed: {err}");
        if matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
        {
            msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
        }
        Err(eyre::eyre!(msg))
    }

    fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
        use libc::{
            SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param,
            sched_setscheduler,
        };
        // SAFETY: plain queries of the scheduler's priority range.
        let (min, max) = unsafe {
            (
                sched_get_priority_min(SCHED_FIFO),
                sched_get_priority_max(SCHED_FIFO),
            )
        };
        if min < 0 || max < 0 {
            eyre::bail!("SCHED_FIFO priority range unavailable");
        }
        let want = prio.unwrap_or(max / 2).clamp(min, max);
        let param = sched_param {
            sched_priority: want,
        };
        // SAFETY: pid 0 is the calling process; `param` outlives the call.
        let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            eyre::bail!("sched_setscheduler(SCHED_FIFO, {want}) failed: {err}; hint: needs CAP_SYS_NICE or an rtprio limit");
        }
        Ok(want)
    }

    RT_ONCE.get_or_init(|| {
        match try_apply_mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "memory locked"),
            Err(e) => tracing::warn!(error = %e, "memory lock not applied"),
        }
        match try_apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "SCHED_FIFO enabled"),
            Err(e) => tracing::warn!(error = %e, "real-time priority not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _lock: RtLock) {
    if rt {
        tracing::warn!("--rt is only supported on Linux; continuing without it");
    }
}
