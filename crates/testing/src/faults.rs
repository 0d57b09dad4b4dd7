//! Scriptable fault injection shared by every fake.

use std::collections::{HashMap, HashSet};

/// Per-operation failure schedule. Operations are referred to by the snake
/// case name of the port method (`"create_group"`, `"update"`, ...).
#[derive(Debug, Default)]
pub struct FaultPlan {
    always: HashSet<String>,
    nth: HashMap<String, u32>,
    counters: HashMap<String, u32>,
}

impl FaultPlan {
    /// Fail every invocation of `op` from now on.
    pub fn fail_on(&mut self, op: &str) {
        self.always.insert(op.to_string());
    }

    /// Fail exactly the `n`-th invocation of `op` (1-based).
    pub fn fail_on_nth(&mut self, op: &str, n: u32) {
        self.nth.insert(op.to_string(), n);
    }

    /// Count this invocation and report whether it should fail.
    pub fn trip(&mut self, op: &str) -> bool {
        let count = self.counters.entry(op.to_string()).or_insert(0);
        *count += 1;
        if self.always.contains(op) {
            return true;
        }
        self.nth.get(op).is_some_and(|n| *n == *count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_failure_trips_exactly_once() {
        let mut plan = FaultPlan::default();
        plan.fail_on_nth("add_member", 2);
        assert!(!plan.trip("add_member"));
        assert!(plan.trip("add_member"));
        assert!(!plan.trip("add_member"));
    }

    #[test]
    fn always_failure_trips_every_time() {
        let mut plan = FaultPlan::default();
        plan.fail_on("update");
        assert!(plan.trip("update"));
        assert!(plan.trip("update"));
    }
}
