use crate::catalog::Hall;
use crate::limits::{MAX_SUGGESTIONS, SUGGESTION_DAY_OFFSETS};
use crate::model::*;

use super::conflict::find_conflict;
use super::{Engine, EngineError};

impl Engine {
    /// Free slots near a requested window: the same hall a day or two either
    /// side, then other halls large enough at the exact window. Same-hall
    /// candidates come first; at most `MAX_SUGGESTIONS` in total.
    pub async fn suggest_alternatives(
        &self,
        resource_id: &ResourceId,
        span: Span,
        expected_attendance: u32,
    ) -> Result<Vec<AlternativeSlot>, EngineError> {
        let hall = self
            .catalog
            .hall(resource_id)
            .await
            .ok_or_else(|| {
                EngineError::InvalidRequest(format!("unknown resource: {resource_id}"))
            })?;
        Ok(self
            .alternatives_for(&hall, &span, expected_attendance, self.clock.now_ms())
            .await)
    }

    pub(super) async fn alternatives_for(
        &self,
        hall: &Hall,
        span: &Span,
        expected_attendance: u32,
        now: Ms,
    ) -> Vec<AlternativeSlot> {
        let mut slots = Vec::with_capacity(MAX_SUGGESTIONS);

        for day_offset in SUGGESTION_DAY_OFFSETS {
            let candidate = span.shifted(day_offset * DAY_MS);
            if candidate.start < now || !self.is_free(&hall.id, &candidate).await {
                continue;
            }
            slots.push(AlternativeSlot {
                resource_id: hall.id.clone(),
                resource_name: hall.name.clone(),
                span: candidate,
                kind: SlotKind::ShiftedDate { day_offset },
            });
        }

        for other in self.catalog.halls().await {
            if slots.len() >= MAX_SUGGESTIONS {
                break;
            }
            if other.id == hall.id || other.capacity < expected_attendance {
                continue;
            }
            if self.is_free(&other.id, span).await {
                slots.push(AlternativeSlot {
                    resource_id: other.id,
                    resource_name: other.name,
                    span: *span,
                    kind: SlotKind::OtherResource,
                });
            }
        }

        slots.truncate(MAX_SUGGESTIONS);
        slots
    }

    /// Takes one read lock at a time; the answer is advisory.
    async fn is_free(&self, resource_id: &ResourceId, span: &Span) -> bool {
        match self.get_resource(resource_id) {
            Some(rs) => find_conflict(&*rs.read().await, span, &Status::LIVE, None).is_none(),
            None => true,
        }
    }
}
