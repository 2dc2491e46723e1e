//! Retention of emitted notifications.
//!
//! Notifications stay listed until the user acknowledges them or they age
//! past the retention window. Durable history is the storage collaborator's
//! job; this log only covers what the UI shows right now.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::Notification;

/// In-memory notification log with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: Vec<Notification>,
    ttl: Duration,
}

impl NotificationLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Vec::new(),
            ttl,
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.entries.push(notification);
    }

    fn expired(&self, notification: &Notification, now: DateTime<Utc>) -> bool {
        now - notification.timestamp > self.ttl
    }

    /// Unacknowledged, unexpired notifications, newest first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut active: Vec<_> = self
            .entries
            .iter()
            .filter(|n| !n.acknowledged && !self.expired(n, now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        active
    }

    /// Mark a notification as acknowledged; it drops out of [`Self::active`].
    pub fn acknowledge(&mut self, id: Uuid) -> EngineResult<Notification> {
        let entry = self
            .entries
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| EngineError::NotificationNotFound(id.to_string()))?;

        entry.acknowledged = true;
        info!(notification_id = %id, rule_id = %entry.rule_id, "Notification acknowledged");
        Ok(entry.clone())
    }

    /// Drop acknowledged and expired entries. Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|n| !n.acknowledged && now - n.timestamp <= ttl);
        let removed = before - self.entries.len();

        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Notification log pruned");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, NotificationKind, NotificationSeverity};

    fn notification(age_hours: i64, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            rule_id: "r1".to_string(),
            kind: NotificationKind::Breach,
            severity: NotificationSeverity::Medium,
            title: "AQI Threshold Exceeded".to_string(),
            message: "test".to_string(),
            location: "Downtown".to_string(),
            aqi: 60.0,
            channel: Channel::App,
            timestamp: now - Duration::hours(age_hours),
            acknowledged: false,
        }
    }

    #[test]
    fn test_active_excludes_expired_and_sorts_newest_first() {
        let now = Utc::now();
        let mut log = NotificationLog::new(Duration::hours(24));
        log.push(notification(30, now));
        log.push(notification(5, now));
        log.push(notification(1, now));

        let active = log.active(now);

        assert_eq!(active.len(), 2);
        assert!(active[0].timestamp > active[1].timestamp);
    }

    #[test]
    fn test_acknowledge_and_prune() {
        let now = Utc::now();
        let mut log = NotificationLog::new(Duration::hours(24));
        let first = notification(1, now);
        let id = first.id;
        log.push(first);
        log.push(notification(2, now));
        log.push(notification(48, now));

        let acked = log.acknowledge(id).unwrap();
        assert!(acked.acknowledged);
        assert_eq!(log.active(now).len(), 1);

        assert_eq!(log.prune(now), 2);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_acknowledge_unknown_id() {
        let mut log = NotificationLog::new(Duration::hours(1));
        let id = Uuid::new_v4();

        assert_eq!(
            log.acknowledge(id),
            Err(EngineError::NotificationNotFound(id.to_string()))
        );
        assert!(log.is_empty());
    }
}
