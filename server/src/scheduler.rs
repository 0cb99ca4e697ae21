//! Delay queue that drives every mob.
//!
//! No mob owns a thread or a timer. Each job runs once and hands back the
//! jobs it wants to run later; the scheduler keeps them ordered by due time
//! on a virtual millisecond clock.

use std::collections::{BTreeMap, HashMap};

use crate::entities::MobId;
use crate::geometry::Vec2;

/// One leg of a movement chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveStep {
    pub mob: MobId,
    /// Token captured when the movement started
    pub token: u64,
    pub start: Vec2,
    pub end: Vec2,
    pub speed: f32,
}

/// Unit of scheduled work
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Job {
    /// Perception and decision pass of one mob
    Tick(MobId),
    MoveStep(MoveStep),
    /// Clear combat state and mark the mob dead
    FinishDeath(MobId),
    Respawn(MobId),
    /// Remove an expired item from the ground
    DespawnItem(u64),
}

impl Job {
    pub fn mob(&self) -> Option<MobId> {
        match self {
            Self::Tick(mob) | Self::FinishDeath(mob) | Self::Respawn(mob) => Some(*mob),
            Self::MoveStep(step) => Some(step.mob),
            Self::DespawnItem(_) => None,
        }
    }
}

/// A job and how long to wait before running it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    pub delay_ms: u64,
    pub job: Job,
}

impl Scheduled {
    pub fn now(job: Job) -> Self {
        Self { delay_ms: 0, job }
    }

    pub fn after(delay_ms: u64, job: Job) -> Self {
        Self { delay_ms, job }
    }
}

type QueueKey = (u64, u64);

/// Ordered queue of pending jobs
#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    seq: u64,
    queue: BTreeMap<QueueKey, Job>,
    /// The single pending movement leg of each mob
    pending_moves: HashMap<MobId, QueueKey>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueue a job relative to the current time. A new movement leg
    /// replaces whatever leg the mob had pending.
    pub fn push(&mut self, scheduled: Scheduled) {
        let key = (self.now + scheduled.delay_ms, self.seq);
        self.seq += 1;
        if let Job::MoveStep(step) = scheduled.job {
            if let Some(old) = self.pending_moves.insert(step.mob, key) {
                self.queue.remove(&old);
            }
        }
        self.queue.insert(key, scheduled.job);
    }

    pub fn extend<I: IntoIterator<Item = Scheduled>>(&mut self, jobs: I) {
        for job in jobs {
            self.push(job);
        }
    }

    /// Drop a mob's pending movement leg
    pub fn cancel_movement(&mut self, mob: MobId) -> bool {
        match self.pending_moves.remove(&mob) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    /// Whether the mob has a movement leg waiting
    pub fn has_pending_movement(&self, mob: MobId) -> bool {
        self.pending_moves.contains_key(&mob)
    }

    /// Due time of the earliest job
    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Take the earliest job if it is due by `until`, moving the clock to it
    pub fn pop_due(&mut self, until: u64) -> Option<Job> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > until {
            return None;
        }
        let job = self.queue.remove(&key)?;
        if let Job::MoveStep(step) = job {
            if self.pending_moves.get(&step.mob) == Some(&key) {
                self.pending_moves.remove(&step.mob);
            }
        }
        self.now = self.now.max(key.0);
        Some(job)
    }

    /// Take every job due by `until` at once and move the clock there.
    /// Follow-ups pushed afterwards are relative to `until`, not to each
    /// job's own due time, so a chain drifts by up to the gap between drains.
    pub fn drain_due(&mut self, until: u64) -> Vec<Job> {
        let mut due = Vec::new();
        while let Some(job) = self.pop_due(until) {
            due.push(job);
        }
        self.now = self.now.max(until);
        due
    }

    /// Move the clock forward without running anything
    pub fn advance_clock(&mut self, until: u64) {
        self.now = self.now.max(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pop and run jobs the way the engine's synchronous driver does
    fn run_until<F: FnMut(Job, u64) -> Vec<Scheduled>>(scheduler: &mut Scheduler, until: u64, mut run: F) {
        while let Some(job) = scheduler.pop_due(until) {
            let now = scheduler.now();
            scheduler.extend(run(job, now));
        }
        scheduler.advance_clock(until);
    }

    fn step(mob: u32, token: u64) -> Job {
        Job::MoveStep(MoveStep {
            mob: MobId(mob),
            token,
            start: Vec2::default(),
            end: Vec2::new(1.0, 0.0),
            speed: 1.0,
        })
    }

    #[test]
    fn test_jobs_run_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.push(Scheduled::after(300, Job::Tick(MobId(1))));
        scheduler.push(Scheduled::after(100, Job::Tick(MobId(2))));
        scheduler.push(Scheduled::after(100, Job::Tick(MobId(3))));

        let mut order = Vec::new();
        run_until(&mut scheduler, 1_000, |job, now| {
            order.push((job.mob(), now));
            Vec::new()
        });
        assert_eq!(
            order,
            vec![
                (Some(MobId(2)), 100),
                (Some(MobId(3)), 100),
                (Some(MobId(1)), 300)
            ]
        );
        assert_eq!(scheduler.now(), 1_000);
    }

    #[test]
    fn test_follow_ups_are_relative_to_their_parent() {
        let mut scheduler = Scheduler::new();
        scheduler.push(Scheduled::now(Job::Tick(MobId(0))));
        let mut runs = Vec::new();
        run_until(&mut scheduler, 3_500, |job, now| {
            runs.push(now);
            vec![Scheduled::after(1_000, job)]
        });
        assert_eq!(runs, vec![0, 1_000, 2_000, 3_000]);
        assert_eq!(scheduler.next_due(), Some(4_000));
    }

    #[test]
    fn test_new_movement_replaces_pending_leg() {
        let mut scheduler = Scheduler::new();
        scheduler.push(Scheduled::after(500, step(4, 1)));
        scheduler.push(Scheduled::after(500, step(4, 2)));
        scheduler.push(Scheduled::after(500, step(5, 3)));
        assert_eq!(scheduler.len(), 2);

        let jobs = scheduler.drain_due(500);
        let tokens: Vec<u64> = jobs
            .iter()
            .filter_map(|j| match j {
                Job::MoveStep(s) => Some(s.token),
                _ => None,
            })
            .collect();
        assert_eq!(tokens, vec![2, 3]);
        assert!(!scheduler.has_pending_movement(MobId(4)));
    }

    #[test]
    fn test_cancel_movement() {
        let mut scheduler = Scheduler::new();
        scheduler.push(Scheduled::after(10, step(1, 9)));
        scheduler.push(Scheduled::after(10, Job::Tick(MobId(1))));
        assert!(scheduler.cancel_movement(MobId(1)));
        assert!(!scheduler.cancel_movement(MobId(1)));
        assert_eq!(scheduler.drain_due(10), vec![Job::Tick(MobId(1))]);
    }
}
