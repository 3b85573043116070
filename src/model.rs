use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::principal::PrincipalId;
use crate::scoring::ScoreBreakdown;

/// Unix milliseconds. Every timestamp in the engine uses it.
pub type Ms = i64;

pub const DAY_MS: Ms = 86_400_000;

pub type ReservationId = Ulid;

/// Rejection reason recorded on a reservation displaced by an approved override.
pub const OVERRIDE_REJECTION_REASON: &str = "Overridden by higher priority reservation";

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Touching boundaries do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Same duration, moved by `delta` ms.
    pub fn shifted(&self, delta: Ms) -> Span {
        Span::new(self.start + delta, self.end + delta)
    }
}

/// Identifier of a bookable hall.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Requesting body. Variants are declared lowest first so the derived
/// ordering reads `Institutional > Departmental > Student > Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Other,
    Student,
    Departmental,
    Institutional,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Institutional,
        Category::Departmental,
        Category::Student,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Institutional => "institutional",
            Category::Departmental => "departmental",
            Category::Student => "student",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    /// Statuses that hold a slot.
    pub const LIVE: [Status; 2] = [Status::Pending, Status::Approved];

    pub fn is_live(&self) -> bool {
        matches!(self, Status::Pending | Status::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input to `Engine::submit`. Fields the caller may omit are `Option`s
/// so that absence is reported, never defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub resource_id: ResourceId,
    pub event_name: String,
    pub description: Option<String>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub category: Option<Category>,
    pub expected_attendance: u32,
    pub override_intent: bool,
}

impl ReservationRequest {
    pub fn new(
        resource_id: impl Into<ResourceId>,
        event_name: impl Into<String>,
        start: Ms,
        end: Ms,
        category: Category,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            event_name: event_name.into(),
            description: None,
            start: Some(start),
            end: Some(end),
            category: Some(category),
            expected_attendance: 0,
            override_intent: false,
        }
    }

    pub fn with_attendance(mut self, expected_attendance: u32) -> Self {
        self.expected_attendance = expected_attendance;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_override(mut self) -> Self {
        self.override_intent = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub requester_id: PrincipalId,
    pub event_name: String,
    pub description: Option<String>,
    pub span: Span,
    pub category: Category,
    pub expected_attendance: u32,
    pub score: ScoreBreakdown,
    pub status: Status,
    /// True iff a live conflicting reservation existed at submission.
    pub conflict_flag: bool,
    pub overridden_reservation_id: Option<ReservationId>,
    pub rejection_reason: Option<String>,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl Reservation {
    /// Earlier creation sorts first; the id breaks same-millisecond ties.
    pub fn creation_key(&self) -> (Ms, ReservationId) {
        (self.created_at, self.id)
    }

    pub fn is_override(&self) -> bool {
        self.conflict_flag && self.overridden_reservation_id.is_some()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            category: self.category,
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub category: Category,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    Approved,
    Rejected,
    OverrideRejected,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Approved => "approved",
            DecisionAction::Rejected => "rejected",
            DecisionAction::OverrideRejected => "override_rejected",
        }
    }
}

/// One state transition. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub reservation_id: ReservationId,
    pub resource_id: ResourceId,
    pub action: DecisionAction,
    pub performed_by: PrincipalId,
    pub previous_status: Status,
    pub new_status: Status,
    pub remarks: Option<String>,
    pub score_snapshot: ScoreSnapshot,
    pub timestamp: Ms,
}

/// All reservations and decisions for one hall.
#[derive(Debug, Clone, Default)]
pub struct ResourceState {
    pub reservations: Vec<Reservation>,
    pub decisions: Vec<DecisionLogEntry>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert maintaining sort order by `span.start`.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn reservation(&self, id: &ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn reservation_mut(&mut self, id: &ReservationId) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// Return only reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }

    pub fn history(&self, id: &ReservationId) -> Vec<DecisionLogEntry> {
        self.decisions
            .iter()
            .filter(|d| d.reservation_id == *id)
            .cloned()
            .collect()
    }

    /// Apply one decision entry to the reservation it names and log it.
    pub fn record_decision(&mut self, entry: &DecisionLogEntry) {
        if let Some(r) = self.reservation_mut(&entry.reservation_id) {
            r.status = entry.new_status;
            r.rejection_reason = match entry.new_status {
                Status::Rejected => entry.remarks.clone(),
                _ => None,
            };
            r.updated_at = entry.timestamp;
        }
        self.decisions.push(entry.clone());
    }
}

/// One WAL record. Replay applies them in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Submitted {
        reservation: Reservation,
    },
    /// Every entry in one record commits together.
    Decided {
        resource_id: ResourceId,
        entries: Vec<DecisionLogEntry>,
    },
    /// Full state of one hall, written by compaction.
    Snapshot {
        resource_id: ResourceId,
        reservations: Vec<Reservation>,
        decisions: Vec<DecisionLogEntry>,
    },
}

impl Event {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Event::Submitted { reservation } => &reservation.resource_id,
            Event::Decided { resource_id, .. } | Event::Snapshot { resource_id, .. } => resource_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// What a conflicting caller is told about the booking in their way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSummary {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub event_name: String,
    pub requester_id: PrincipalId,
    pub category: Category,
    pub span: Span,
    pub score: u32,
    pub status: Status,
}

impl From<&Reservation> for ReservationSummary {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id,
            resource_id: r.resource_id.clone(),
            event_name: r.event_name.clone(),
            requester_id: r.requester_id.clone(),
            category: r.category,
            span: r.span,
            score: r.score.total,
            status: r.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Same hall, same time of day, `day_offset` days away.
    ShiftedDate { day_offset: i64 },
    /// Another hall at the requested window.
    OtherResource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternativeSlot {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub span: Span,
    pub kind: SlotKind,
}
