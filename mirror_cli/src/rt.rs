//! Real-time setup for the polling thread (Linux: mlockall, SCHED_FIFO, CPU affinity).
//!
//! Every step is best effort: a failure is logged and the loop still runs,
//! only with more timing jitter on echo measurements.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    use tracing::{info, warn};
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(applied) => info!(lock = applied, "rt: memory lock applied"),
            Err(err) => warn!(error = %err, "rt: mlockall failed"),
        }
        match set_fifo_priority(prio) {
            Ok(p) => info!(priority = p, "rt: SCHED_FIFO applied"),
            Err(err) => warn!(requested = ?prio, error = %err, "rt: SCHED_FIFO not applied"),
        }
        match pin_to_cpu(rt_cpu.unwrap_or(0)) {
            Ok(cpu) => info!(cpu, "rt: affinity applied"),
            Err(err) => warn!(error = %err, "rt: affinity not applied"),
        }
    });
}

#[cfg(target_os = "linux")]
fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    // SAFETY: mlockall takes flags only and touches no caller memory.
    let rc = unsafe { libc::mlockall(flags) };
    if rc != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Lock memory per `lock`; `All` falls back to `Current` on EPERM/ENOMEM.
#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> eyre::Result<&'static str> {
    use libc::{MCL_CURRENT, MCL_FUTURE};

    fn retryable(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    fn limit_hint() -> String {
        let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
        // SAFETY: getrlimit fills the struct on success; we only read it then.
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
        if rc != 0 {
            return "needs CAP_IPC_LOCK (or root) and enough 'ulimit -l'".to_string();
        }
        // SAFETY: rc == 0.
        let cur = unsafe { rlim.assume_init() }.rlim_cur;
        if cur == libc::RLIM_INFINITY {
            "memlock limit: unlimited; needs CAP_IPC_LOCK (or root)".to_string()
        } else {
            format!(
                "memlock limit: {} KiB; needs CAP_IPC_LOCK (or root) and enough 'ulimit -l'",
                cur / 1024
            )
        }
    }

    let err = match lock {
        RtLock::None => return Ok("none"),
        RtLock::Current => match mlockall(MCL_CURRENT) {
            Ok(()) => return Ok("current"),
            Err(e) => e,
        },
        RtLock::All => match mlockall(MCL_CURRENT | MCL_FUTURE) {
            Ok(()) => return Ok("all"),
            Err(e) if retryable(&e) => match mlockall(MCL_CURRENT) {
                Ok(()) => return Ok("current (fallback from all)"),
                Err(e2) => {
                    eyre::bail!("mlockall(current|future) failed: {e}; fallback to current also failed: {e2}; {}", limit_hint())
                }
            },
            Err(e) => e,
        },
    };
    if retryable(&err) {
        eyre::bail!("{err}; {}", limit_hint());
    }
    Err(eyre::eyre!(err))
}

/// Apply SCHED_FIFO; the priority is clamped to the system range (default: max).
#[cfg(target_os = "linux")]
fn set_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: pure queries on the scheduling policy.
    let (min, max) = unsafe {
        (
            sched_get_priority_min(SCHED_FIFO),
            sched_get_priority_max(SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let value = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: value,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling process.
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            eyre::bail!("{err}; needs CAP_SYS_NICE or root (e.g. 'sudo setcap cap_sys_nice=ep mirror')");
        }
        return Err(eyre::eyre!(err));
    }
    Ok(value)
}

/// Pin the process to `target` if the current affinity mask allows it.
#[cfg(target_os = "linux")]
fn pin_to_cpu(target: usize) -> eyre::Result<usize> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

    // SAFETY: sysconf has no memory arguments.
    let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if online < 1 {
        eyre::bail!("_SC_NPROCESSORS_ONLN < 1");
    }
    if target as libc::c_long >= online {
        eyre::bail!("requested CPU {target} >= online {online}");
    }
    if target >= MAX_CPUSET_BITS {
        eyre::bail!("requested CPU {target} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
    }

    // SAFETY: cpu_set_t is plain bits; zeroed is a valid empty set and the
    // size passed matches the buffer.
    let allowed = unsafe {
        let mut set: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut set);
        if libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut set) != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
        CPU_ISSET(target, &set)
    };
    if !allowed {
        eyre::bail!("CPU {target} not permitted by current affinity mask");
    }

    // SAFETY: as above.
    let rc = unsafe {
        let mut desired: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut desired);
        CPU_SET(target, &mut desired);
        libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &desired)
    };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(target)
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    tracing::warn!(
        ?prio,
        ?lock,
        ?rt_cpu,
        "real-time mode is only supported on Linux; --rt ignored"
    );
}
