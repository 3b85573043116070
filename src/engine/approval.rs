use tracing::{debug, info};

use crate::model::*;
use crate::observability::DECISIONS_TOTAL;
use crate::principal::Principal;

use super::conflict::{find_conflict_excluding, validate_remarks};
use super::{Engine, EngineError};

impl Engine {
    /// Approve a pending reservation.
    ///
    /// For an override request the displaced reservation is rejected in the
    /// same WAL record as this approval, so both commit or neither does.
    pub async fn approve(
        &self,
        principal: &Principal,
        id: ReservationId,
        remarks: Option<String>,
    ) -> Result<Reservation, EngineError> {
        principal.require_admin()?;
        validate_remarks(remarks.as_deref())?;

        let permit = self.commit_permit().await;
        let (resource_id, guard) = self.resolve_reservation_write(&id).await?;
        let now = self.clock.now_ms();

        let current = guard.reservation(&id).ok_or(EngineError::NotFound(id))?.clone();
        match current.status {
            Status::Approved => return Err(EngineError::AlreadyApproved(id)),
            Status::Rejected => return Err(EngineError::AlreadyRejected(id)),
            Status::Pending => {}
        }

        let target = current
            .overridden_reservation_id
            .filter(|_| current.conflict_flag);

        // Anything live in the slot other than ourselves and our declared target
        // blocks approval.
        let mut exclude = vec![id];
        exclude.extend(target);
        let blocking = find_conflict_excluding(&guard, &current.span, &Status::LIVE, &exclude);
        if let Some(other) = blocking {
            info!(reservation = %id, conflicting = %other.id, "approval blocked by conflict");
            return Err(EngineError::Conflict {
                reservation: id,
                conflicting: other.id,
            });
        }

        let mut entries = Vec::with_capacity(2);
        if let Some(displaced) = target
            .and_then(|t| guard.reservation(&t))
            .filter(|t| t.status.is_live())
        {
            entries.push(DecisionLogEntry {
                reservation_id: displaced.id,
                resource_id: resource_id.clone(),
                action: DecisionAction::OverrideRejected,
                performed_by: principal.id.clone(),
                previous_status: displaced.status,
                new_status: Status::Rejected,
                remarks: Some(OVERRIDE_REJECTION_REASON.to_string()),
                score_snapshot: displaced.snapshot(),
                timestamp: now,
            });
        }
        entries.push(DecisionLogEntry {
            reservation_id: id,
            resource_id: resource_id.clone(),
            action: DecisionAction::Approved,
            performed_by: principal.id.clone(),
            previous_status: current.status,
            new_status: Status::Approved,
            remarks,
            score_snapshot: current.snapshot(),
            timestamp: now,
        });

        let event = Event::Decided {
            resource_id,
            entries: entries.clone(),
        };
        let guard = self.persist_and_apply(permit, guard, event).await?;
        for entry in &entries {
            metrics::counter!(DECISIONS_TOTAL, "action" => entry.action.as_str()).increment(1);
            info!(
                reservation = %entry.reservation_id,
                action = entry.action.as_str(),
                by = %entry.performed_by,
                "decision recorded"
            );
        }

        guard
            .reservation(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// Reject a pending reservation. Rejecting an already rejected one is a
    /// no-op that returns its current state.
    pub async fn reject(
        &self,
        principal: &Principal,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation, EngineError> {
        principal.require_admin()?;
        validate_remarks(reason.as_deref())?;

        let permit = self.commit_permit().await;
        let (resource_id, guard) = self.resolve_reservation_write(&id).await?;
        let now = self.clock.now_ms();

        let current = guard.reservation(&id).ok_or(EngineError::NotFound(id))?.clone();
        match current.status {
            Status::Rejected => {
                debug!(reservation = %id, "already rejected");
                return Ok(current);
            }
            Status::Approved => return Err(EngineError::AlreadyApproved(id)),
            Status::Pending => {}
        }

        let entry = DecisionLogEntry {
            reservation_id: id,
            resource_id: resource_id.clone(),
            action: DecisionAction::Rejected,
            performed_by: principal.id.clone(),
            previous_status: current.status,
            new_status: Status::Rejected,
            remarks: reason,
            score_snapshot: current.snapshot(),
            timestamp: now,
        };
        let event = Event::Decided {
            resource_id,
            entries: vec![entry],
        };
        let guard = self.persist_and_apply(permit, guard, event).await?;

        metrics::counter!(DECISIONS_TOTAL, "action" => DecisionAction::Rejected.as_str())
            .increment(1);
        info!(reservation = %id, by = %principal.id, "reservation rejected");

        guard
            .reservation(&id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }
}
