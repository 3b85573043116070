use tracing::info;
use ulid::Ulid;

use crate::model::*;
use crate::observability::{SUBMISSIONS_TOTAL, submission_label};
use crate::principal::Principal;
use crate::scoring::{self, PriorityAnalysis};

use super::conflict::{find_conflict, validate_request};
use super::{Engine, EngineError};

/// Returned instead of a reservation when the slot is taken and the caller
/// did not ask to override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReport {
    pub existing: ReservationSummary,
    pub analysis: PriorityAnalysis,
    pub alternatives: Vec<AlternativeSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(Reservation),
    Conflict(ConflictReport),
}

impl SubmitOutcome {
    pub fn accepted(&self) -> Option<&Reservation> {
        match self {
            SubmitOutcome::Accepted(r) => Some(r),
            SubmitOutcome::Conflict(_) => None,
        }
    }

    pub fn conflict(&self) -> Option<&ConflictReport> {
        match self {
            SubmitOutcome::Accepted(_) => None,
            SubmitOutcome::Conflict(c) => Some(c),
        }
    }
}

impl Engine {
    /// Validate, score and place a request. The conflict check and the insert
    /// happen under the hall's write lock, so two submissions for the same
    /// slot can never both land without one seeing the other.
    pub async fn submit(
        &self,
        principal: &Principal,
        request: ReservationRequest,
    ) -> Result<SubmitOutcome, EngineError> {
        let result = self.submit_inner(principal, request).await;
        metrics::counter!(SUBMISSIONS_TOTAL, "outcome" => submission_label(&result)).increment(1);
        result
    }

    async fn submit_inner(
        &self,
        principal: &Principal,
        request: ReservationRequest,
    ) -> Result<SubmitOutcome, EngineError> {
        let hall = if request.resource_id.is_empty() {
            None
        } else {
            self.catalog.hall(&request.resource_id).await
        };
        let now = self.clock.now_ms();
        let valid = validate_request(&request, hall, now)?;
        let score = scoring::score(
            valid.category,
            now,
            valid.span.start,
            request.expected_attendance,
        );

        let permit = self.commit_permit().await;
        let rs = self.resource_or_default(&request.resource_id);
        let guard = rs.write_owned().await;

        let existing = find_conflict(&guard, &valid.span, &Status::LIVE, None).cloned();
        if let Some(existing) = existing.as_ref().filter(|_| !request.override_intent) {
            drop(guard);
            drop(permit);
            let analysis = scoring::compare(score.total, existing.score.total);
            info!(
                resource = %request.resource_id,
                existing = %existing.id,
                new_score = score.total,
                existing_score = existing.score.total,
                recommendation = analysis.recommendation.as_str(),
                "submission conflicts"
            );
            let alternatives = self
                .alternatives_for(&valid.hall, &valid.span, request.expected_attendance, now)
                .await;
            return Ok(SubmitOutcome::Conflict(ConflictReport {
                existing: ReservationSummary::from(existing),
                analysis,
                alternatives,
            }));
        }

        let reservation = Reservation {
            id: Ulid::new(),
            resource_id: request.resource_id,
            requester_id: principal.id.clone(),
            event_name: request.event_name,
            description: request.description,
            span: valid.span,
            category: valid.category,
            expected_attendance: request.expected_attendance,
            score,
            status: Status::Pending,
            conflict_flag: existing.is_some(),
            overridden_reservation_id: existing.as_ref().map(|e| e.id),
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        let event = Event::Submitted {
            reservation: reservation.clone(),
        };
        self.persist_and_apply(permit, guard, event).await?;

        info!(
            reservation = %reservation.id,
            resource = %reservation.resource_id,
            requester = %reservation.requester_id,
            score = reservation.score.total,
            overrides = ?reservation.overridden_reservation_id,
            "reservation submitted"
        );
        Ok(SubmitOutcome::Accepted(reservation))
    }
}
