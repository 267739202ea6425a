//! Traffic Message Channel (ALERT-C) decoding and message store.
//!
//! Group 8A carries one coded traffic event per group: a 3-bit duration
//! code, a direction bit, a 3-bit extent and an 11-bit event code in block
//! C, and a 16-bit location code in block D. Event codes map through a range
//! table to a category and severity tier; the duration code selects the
//! message lifetime. Messages are keyed by location plus event code, so a
//! repeated broadcast refreshes the existing entry instead of duplicating
//! it. Expired entries are evicted lazily on every read.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use super::groups::RdsGroup;

/// Severity tier of a traffic event, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    None,
    Minor,
    Moderate,
    Severe,
    Critical,
}

/// Broad event category derived from the event-code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventCategory {
    TrafficFlow,
    Queue,
    Accident,
    Closure,
    LaneRestriction,
    Roadworks,
    Obstruction,
    Weather,
    RoadCondition,
    Unknown,
}

/// Carriageway direction the event applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Positive,
    Negative,
}

/// Event-code range table: inclusive range, category, severity tier.
/// Codes outside every range decode as `Unknown` / `None`.
const EVENT_TABLE: &[(u16, u16, EventCategory, Severity)] = &[
    (1, 50, EventCategory::TrafficFlow, Severity::Minor),
    (51, 150, EventCategory::Queue, Severity::Moderate),
    (151, 250, EventCategory::Accident, Severity::Severe),
    (251, 350, EventCategory::Closure, Severity::Critical),
    (351, 450, EventCategory::LaneRestriction, Severity::Moderate),
    (451, 600, EventCategory::Roadworks, Severity::Moderate),
    (601, 700, EventCategory::Obstruction, Severity::Severe),
    (701, 850, EventCategory::Weather, Severity::Moderate),
    (851, 1000, EventCategory::RoadCondition, Severity::Severe),
];

/// Look up category and severity for an event code.
pub fn classify_event(event: u16) -> (EventCategory, Severity) {
    for &(lo, hi, category, severity) in EVENT_TABLE {
        if (lo..=hi).contains(&event) {
            return (category, severity);
        }
    }
    (EventCategory::Unknown, Severity::None)
}

/// Message lifetime for a 3-bit duration code. Code 7 means the event
/// persists until explicitly cleared; any unlisted code gets no expiry.
pub fn duration_for_code(code: u8) -> Option<Duration> {
    match code {
        0 | 1 => Some(Duration::minutes(15)),
        2 => Some(Duration::minutes(30)),
        3 => Some(Duration::hours(1)),
        4 => Some(Duration::hours(2)),
        5 => Some(Duration::hours(3)),
        6 => Some(Duration::hours(4)),
        _ => None,
    }
}

/// One decoded traffic message.
#[derive(Debug, Clone, Serialize)]
pub struct TmcMessage {
    /// Store-assigned handle, stable across refreshes
    pub id: u64,
    pub event: u16,
    pub location: u16,
    pub direction: Direction,
    /// Number of locations the event extends over, 0–7
    pub extent: u8,
    pub category: EventCategory,
    pub severity: Severity,
    pub start_time: DateTime<Utc>,
    /// `None` means the message never expires on its own
    pub expires_at: Option<DateTime<Utc>>,
}

/// Raw fields of a group 8A payload.
#[derive(Debug, Clone, Copy)]
pub struct TmcEvent {
    pub duration_code: u8,
    pub direction: Direction,
    pub extent: u8,
    pub event: u16,
    pub location: u16,
}

impl TmcEvent {
    /// Extract the ALERT-C fields from a type 8A group.
    pub fn from_group(group: &RdsGroup) -> Self {
        let block_c = group.blocks[2];
        Self {
            duration_code: (group.blocks[1] & 0x0007) as u8,
            direction: if block_c & 0x4000 == 0 {
                Direction::Positive
            } else {
                Direction::Negative
            },
            extent: ((block_c >> 11) & 0x0007) as u8,
            event: block_c & 0x07FF,
            location: group.blocks[3],
        }
    }
}

/// Store of active traffic messages.
#[derive(Debug, Clone, Default)]
pub struct TmcStore {
    messages: Vec<TmcMessage>,
    next_id: u64,
    messages_received: u64,
    last_message_at: Option<DateTime<Utc>>,
}

impl TmcStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total messages accepted since construction or the last reset,
    /// refreshes included.
    pub fn messages_received(&self) -> u64 {
        self.messages_received
    }

    /// Arrival time of the most recent message.
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Insert a decoded event, or refresh the entry sharing its location and
    /// event code. The refreshed entry keeps its id but restarts its clock.
    pub fn upsert(&mut self, event: TmcEvent, now: DateTime<Utc>) -> u64 {
        let (category, severity) = classify_event(event.event);
        let expires_at = duration_for_code(event.duration_code).map(|d| now + d);
        self.messages_received += 1;
        self.last_message_at = Some(now);

        if let Some(existing) = self
            .messages
            .iter_mut()
            .find(|m| m.location == event.location && m.event == event.event)
        {
            existing.direction = event.direction;
            existing.extent = event.extent;
            existing.start_time = now;
            existing.expires_at = expires_at;
            debug!(id = existing.id, event = event.event, location = event.location, "refreshed traffic message");
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        debug!(id, event = event.event, location = event.location, ?severity, "new traffic message");
        self.messages.push(TmcMessage {
            id,
            event: event.event,
            location: event.location,
            direction: event.direction,
            extent: event.extent,
            category,
            severity,
            start_time: now,
            expires_at,
        });
        id
    }

    /// Active messages as of `now`.
    ///
    /// Every entry whose expiry is at or before `now` is evicted first; the
    /// remainder comes back sorted by severity descending, ties broken by
    /// most-recent start time.
    pub fn messages_at(&mut self, now: DateTime<Utc>) -> Vec<TmcMessage> {
        self.messages
            .retain(|m| m.expires_at.map_or(true, |t| t > now));
        let mut out = self.messages.clone();
        out.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.start_time.cmp(&a.start_time))
        });
        out
    }

    /// Count of active messages as of `now`, after eviction.
    pub fn active_count(&mut self, now: DateTime<Utc>) -> usize {
        self.messages
            .retain(|m| m.expires_at.map_or(true, |t| t > now));
        self.messages.len()
    }
}
