//! Recurring jobs that feed the event queue.
//!
//! A job fires at a fixed interval, measured from its last firing, and
//! produces a `SCHEDULED` event tagged with the job's name. The run loop
//! polls the scheduler once per tick, so granularity is bounded by the
//! tick rate, not by the interval.

use std::time::{Duration, Instant};

use crate::event::{names, Event};

type JobCallback = Box<dyn FnMut()>;

struct Job {
    interval: Duration,
    last: Instant,
    tag: String,
    callback: Option<JobCallback>,
}

/// Interval jobs, polled from the run loop.
#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a `SCHEDULED` event tagged `tag` every `interval`.
    pub fn every(&mut self, interval: Duration, tag: impl Into<String>) {
        self.jobs.push(Job {
            interval,
            last: Instant::now(),
            tag: tag.into(),
            callback: None,
        });
    }

    /// Like [`every`](Self::every), but also runs a callback when the job
    /// fires, before the event is delivered.
    pub fn every_with(&mut self, interval: Duration, tag: impl Into<String>, callback: JobCallback) {
        self.jobs.push(Job {
            interval,
            last: Instant::now(),
            tag: tag.into(),
            callback: Some(callback),
        });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Fire every due job and return the events to enqueue.
    pub fn run_pending(&mut self) -> Vec<Event> {
        self.run_pending_at(Instant::now())
    }

    fn run_pending_at(&mut self, now: Instant) -> Vec<Event> {
        let mut out = Vec::new();
        for job in &mut self.jobs {
            if now.duration_since(job.last) < job.interval {
                continue;
            }
            job.last = now;
            if let Some(callback) = job.callback.as_mut() {
                callback();
            }
            out.push(
                Event::new(names::SCHEDULED)
                    .from_tag(job.tag.clone())
                    .to_path("/root"),
            );
        }
        out
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::event::EventSource;

    #[test]
    fn job_fires_only_after_interval() {
        let mut scheduler = Scheduler::new();
        scheduler.every(Duration::from_secs(10), "tick");

        let start = Instant::now();
        assert!(scheduler.run_pending_at(start).is_empty());
        assert!(scheduler
            .run_pending_at(start + Duration::from_secs(5))
            .is_empty());

        let fired = scheduler.run_pending_at(start + Duration::from_secs(11));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].name, names::SCHEDULED);
        assert_eq!(fired[0].source, EventSource::Tag("tick".to_owned()));
    }

    #[test]
    fn interval_restarts_from_last_firing() {
        let mut scheduler = Scheduler::new();
        scheduler.every(Duration::from_secs(10), "tick");

        let start = Instant::now();
        assert_eq!(
            scheduler
                .run_pending_at(start + Duration::from_secs(10))
                .len(),
            1
        );
        // Only 5s since the last firing.
        assert!(scheduler
            .run_pending_at(start + Duration::from_secs(15))
            .is_empty());
        assert_eq!(
            scheduler
                .run_pending_at(start + Duration::from_secs(20))
                .len(),
            1
        );
    }

    #[test]
    fn callback_runs_when_due() {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);

        let mut scheduler = Scheduler::new();
        scheduler.every_with(
            Duration::from_secs(1),
            "job",
            Box::new(move || seen.set(seen.get() + 1)),
        );

        let start = Instant::now();
        scheduler.run_pending_at(start + Duration::from_secs(2));
        assert_eq!(count.get(), 1);
    }
}
