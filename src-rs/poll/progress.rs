use crate::client::GroupProgress;

/// Folds successive group progress responses into what the view shows.
///
/// `total` only grows while the group is active, `completed` never exceeds a
/// known `total`, and a complete group stays complete.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    latest: Option<GroupProgress>,
    completion_reported: bool,
}

impl ProgressTracker {
    pub fn observe(&mut self, reported: GroupProgress) -> GroupProgress {
        let previous = self.latest.unwrap_or_default();
        if previous.is_complete() {
            return previous;
        }

        let mut total = reported.total;
        if total < previous.total {
            tracing::warn!(
                reported = reported.total,
                known = previous.total,
                "Ignoring downward revision of group total",
            );
            total = previous.total;
        }
        let completed = if total > 0 {
            reported.completed.min(total)
        } else {
            reported.completed
        };

        let next = GroupProgress {
            completed,
            total,
            status: reported.status,
        };
        self.latest = Some(next);
        next
    }

    /// `true` exactly once, after the first complete snapshot.
    pub fn take_completion(&mut self) -> bool {
        match self.latest {
            Some(progress) if progress.is_complete() && !self.completion_reported => {
                self.completion_reported = true;
                true
            }
            _ => false,
        }
    }

    pub fn latest(&self) -> Option<GroupProgress> {
        self.latest
    }
}
