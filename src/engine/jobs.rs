use std::cell::UnsafeCell;
use std::fmt;

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::signals::ChldGuard;

/// Most jobs the table can hold at once.
pub const MAX_JOBS: usize = 64;
/// Most stages a single pipeline may have.
pub const MAX_PROCS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
            JobState::Done => write!(f, "Done"),
        }
    }
}

/// The shell's record of one launched pipeline.
#[derive(Debug)]
pub struct Job {
    pub jid: usize,
    /// Creation order; only used to recompute the current/previous
    /// marks.
    seq: u64,
    pub pgid: Pid,
    pub pids: Vec<Pid>,
    /// Pid of the final stage; its status decides the exit code.
    pub last_pid: Pid,
    /// Status of the final stage, once the reaper has seen it.
    pub last_status: Option<WaitStatus>,
    /// Children not yet reaped as exited or signaled. Zero iff the
    /// job is Done.
    pub alive: usize,
    pub state: JobState,
    pub printable: String,
    /// Whether the latest state change has been shown to the user.
    pub notified: bool,
}

/// Fixed-slot job table. Slot `i` holds the job with jid `i + 1`, so
/// iteration order is jid order and the smallest free slot yields the
/// smallest free jid.
///
/// The table is shared with the SIGCHLD reaper; every main-line access
/// goes through [`with_table`], which requires SIGCHLD to be blocked.
/// The reaper itself touches only preallocated fields (no allocation,
/// no I/O).
pub struct JobTable {
    slots: [Option<Job>; MAX_JOBS],
    next_seq: u64,
    /// jid of the current job (`%+`), 0 when there is none.
    current: usize,
    /// jid of the previous job (`%-`), 0 when there is none.
    previous: usize,
}

impl JobTable {
    pub const fn new() -> Self {
        const EMPTY: Option<Job> = None;
        JobTable {
            slots: [EMPTY; MAX_JOBS],
            next_seq: 1,
            current: 0,
            previous: 0,
        }
    }

    /// Register a freshly forked pipeline. Assigns the smallest free
    /// jid; fails when all slots are taken.
    pub fn add(
        &mut self,
        pgid: Pid,
        pids: Vec<Pid>,
        last_pid: Pid,
        printable: String,
    ) -> Result<usize, &'static str> {
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or("too many jobs")?;
        let jid = idx + 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots[idx] = Some(Job {
            jid,
            seq,
            pgid,
            alive: pids.len(),
            last_pid,
            pids,
            last_status: None,
            state: JobState::Running,
            printable,
            notified: false,
        });
        self.recompute_current_previous();
        Ok(jid)
    }

    pub fn get(&self, jid: usize) -> Option<&Job> {
        match jid {
            1..=MAX_JOBS => self.slots[jid - 1].as_ref(),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, jid: usize) -> Option<&mut Job> {
        match jid {
            1..=MAX_JOBS => self.slots[jid - 1].as_mut(),
            _ => None,
        }
    }

    pub fn by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|job| job.pids.contains(&pid))
    }

    /// Drop a job. An emptied table starts numbering from scratch.
    pub fn remove(&mut self, jid: usize) {
        if let 1..=MAX_JOBS = jid {
            self.slots[jid - 1] = None;
        }
        if self.slots.iter().all(Option::is_none) {
            self.current = 0;
            self.previous = 0;
            self.next_seq = 1;
        } else {
            self.recompute_current_previous();
        }
    }

    /// Current = the job created (or re-sequenced) most recently,
    /// previous = the runner-up.
    pub fn recompute_current_previous(&mut self) {
        let mut ranked: Vec<(u64, usize)> = self
            .slots
            .iter()
            .flatten()
            .map(|job| (job.seq, job.jid))
            .collect();
        ranked.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        self.current = ranked.first().map_or(0, |&(_, jid)| jid);
        self.previous = ranked.get(1).map_or(0, |&(_, jid)| jid);
    }

    /// Make `jid` the current job by giving it the newest sequence
    /// number; the old current becomes previous and the marks survive
    /// later recomputation.
    pub fn make_current(&mut self, jid: usize) {
        let seq = self.next_seq;
        if let Some(job) = self.get_mut(jid) {
            job.seq = seq;
        } else {
            return;
        }
        self.next_seq += 1;
        self.recompute_current_previous();
    }

    /// Resolve a parsed job spec to a live jid.
    pub fn resolve(&self, spec: &JobSpec) -> Result<usize, String> {
        match spec {
            JobSpec::Current => match self.current {
                0 => Err("current".to_string()),
                jid => Ok(jid),
            },
            JobSpec::Previous => match self.previous {
                0 => Err("previous".to_string()),
                jid => Ok(jid),
            },
            JobSpec::Jid(jid) => match self.get(*jid) {
                Some(_) => Ok(*jid),
                None => Err(format!("%{}", jid)),
            },
        }
    }

    fn mark(&self, jid: usize) -> char {
        if jid == self.current {
            '+'
        } else if jid == self.previous {
            '-'
        } else {
            ' '
        }
    }

    /// One `[jid]+  State\tcommand` notification line.
    pub fn render(&self, job: &Job) -> String {
        format!(
            "[{}]{}  {}\t{}",
            job.jid,
            self.mark(job.jid),
            job.state,
            job.printable
        )
    }

    /// Notification lines for every job, in jid order. Does not touch
    /// the `notified` flags.
    pub fn render_all(&self) -> Vec<String> {
        self.slots
            .iter()
            .flatten()
            .map(|job| self.render(job))
            .collect()
    }

    /// Collect lines for every unreported Stopped/Done job, marking
    /// them notified and dropping the Done ones.
    pub fn take_notifications(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut done = Vec::new();
        for idx in 0..MAX_JOBS {
            let (current, previous) = (self.current, self.previous);
            if let Some(job) = &mut self.slots[idx] {
                if job.notified || job.state == JobState::Running {
                    continue;
                }
                let mark = if job.jid == current {
                    '+'
                } else if job.jid == previous {
                    '-'
                } else {
                    ' '
                };
                lines.push(format!(
                    "[{}]{}  {}\t{}",
                    job.jid, mark, job.state, job.printable
                ));
                job.notified = true;
                if job.state == JobState::Done {
                    done.push(job.jid);
                }
            }
        }
        for jid in done {
            self.remove(jid);
        }
        lines
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

// ── Job specs ──────────────────────────────────────────────────────────────

/// A user-supplied reference to a job: `%%`/`%+`/nothing, `%-`, or a
/// (possibly `%`-prefixed) jid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSpec {
    Current,
    Previous,
    Jid(usize),
}

impl JobSpec {
    /// Parse the argument given to `fg`/`bg`. Errors carry the text
    /// to show in the "no such job" diagnostic.
    pub fn parse(arg: Option<&str>) -> Result<Self, String> {
        let Some(arg) = arg else {
            return Ok(JobSpec::Current);
        };
        match arg {
            "%%" | "%+" => Ok(JobSpec::Current),
            "%-" => Ok(JobSpec::Previous),
            _ => {
                let digits = arg.strip_prefix('%').unwrap_or(arg);
                digits
                    .parse::<usize>()
                    .map(JobSpec::Jid)
                    .map_err(|_| arg.to_string())
            }
        }
    }
}

// ── Shared table ───────────────────────────────────────────────────────────

struct TableCell(UnsafeCell<JobTable>);

// One thread plus a signal handler; exclusion is by SIGCHLD masking,
// not by a lock.
unsafe impl Sync for TableCell {}

static TABLE: TableCell = TableCell(UnsafeCell::new(JobTable::new()));

/// Raw access for the reaper.
///
/// # Safety
/// Only callable where SIGCHLD cannot interrupt: inside its own
/// handler (the kernel masks it for the duration) or with a
/// [`ChldGuard`] held. The caller must not create overlapping
/// references.
pub(crate) unsafe fn table_raw() -> &'static mut JobTable {
    unsafe { &mut *TABLE.0.get() }
}

/// Run `f` against the job table. The guard proves SIGCHLD is blocked,
/// so the reaper cannot fire mid-access. `f` must not call back into
/// `with_table`.
pub fn with_table<R>(_guard: &ChldGuard, f: impl FnOnce(&mut JobTable) -> R) -> R {
    unsafe { f(table_raw()) }
}

/// Print every pending Stopped/Done notification and drop the reported
/// Done jobs. Runs on the main line only.
pub fn report_changes() {
    let guard = ChldGuard::block();
    let lines = with_table(&guard, JobTable::take_notifications);
    drop(guard);
    for line in lines {
        println!("{}", line);
    }
}

/// Map a final-stage wait status to the shell's exit code convention.
pub fn exit_code(status: Option<WaitStatus>) -> i32 {
    match status {
        Some(WaitStatus::Exited(_, code)) => code & 0xff,
        Some(WaitStatus::Signaled(_, sig, _)) => 128 + sig as i32,
        _ => 0,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
