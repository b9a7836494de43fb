use crate::engine::jobs;
use crate::signals::ChldGuard;

/// List the job table in jid order. Pending notifications stay
/// pending; `jobs` is a report, not an acknowledgement.
pub fn run(_args: &[String]) -> i32 {
    let guard = ChldGuard::block();
    let lines = jobs::with_table(&guard, |t| t.render_all());
    drop(guard);
    for line in lines {
        println!("{}", line);
    }
    0
}
