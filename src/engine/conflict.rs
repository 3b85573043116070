use crate::catalog::Hall;
use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// The canonical conflicting reservation for `span`: among overlapping
/// reservations whose status is in `statuses`, the highest score wins and
/// earlier creation breaks ties.
pub fn find_conflict<'a>(
    rs: &'a ResourceState,
    span: &Span,
    statuses: &[Status],
    exclude: Option<ReservationId>,
) -> Option<&'a Reservation> {
    find_conflict_excluding(rs, span, statuses, exclude.as_slice())
}

pub(crate) fn find_conflict_excluding<'a>(
    rs: &'a ResourceState,
    span: &Span,
    statuses: &[Status],
    exclude: &[ReservationId],
) -> Option<&'a Reservation> {
    rs.overlapping(span)
        .filter(|r| statuses.contains(&r.status))
        .filter(|r| !exclude.contains(&r.id))
        .max_by(|a, b| {
            a.score
                .total
                .cmp(&b.score.total)
                .then_with(|| b.creation_key().cmp(&a.creation_key()))
        })
}

/// A request that passed every check, with its required fields unwrapped.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedRequest {
    pub span: Span,
    pub category: Category,
    pub hall: Hall,
}

/// Checks run in a fixed order and the first failure wins: missing fields,
/// then window shape, then past start, then bounded fields.
pub(crate) fn validate_request(
    req: &ReservationRequest,
    hall: Option<Hall>,
    now: Ms,
) -> Result<ValidatedRequest, EngineError> {
    if req.resource_id.is_empty() {
        return Err(EngineError::InvalidRequest("resource_id is required".into()));
    }
    if req.event_name.trim().is_empty() {
        return Err(EngineError::InvalidRequest("event_name is required".into()));
    }
    let (Some(start), Some(end)) = (req.start, req.end) else {
        return Err(EngineError::InvalidRequest("start and end are required".into()));
    };
    let Some(category) = req.category else {
        return Err(EngineError::InvalidRequest("category is required".into()));
    };
    let Some(hall) = hall else {
        return Err(EngineError::InvalidRequest(format!(
            "unknown resource: {}",
            req.resource_id
        )));
    };

    if end <= start {
        return Err(EngineError::InvalidWindow { start, end });
    }
    if start < now {
        return Err(EngineError::PastWindow { start, now });
    }

    if end > MAX_VALID_TIMESTAMP_MS || start < MIN_VALID_TIMESTAMP_MS {
        return Err(EngineError::OutOfRange("timestamp out of range".into()));
    }
    let span = Span::new(start, end);
    if span.duration_ms() > MAX_WINDOW_MS {
        return Err(EngineError::OutOfRange("window too long".into()));
    }
    if req.expected_attendance > MAX_ATTENDANCE {
        return Err(EngineError::OutOfRange(format!(
            "expected attendance {} exceeds {MAX_ATTENDANCE}",
            req.expected_attendance
        )));
    }
    if req.expected_attendance > hall.capacity {
        return Err(EngineError::OutOfRange(format!(
            "expected attendance {} exceeds capacity {} of {}",
            req.expected_attendance, hall.capacity, hall.id
        )));
    }
    if req.event_name.len() > MAX_NAME_LEN {
        return Err(EngineError::OutOfRange("event name too long".into()));
    }
    if req
        .description
        .as_ref()
        .is_some_and(|d| d.len() > MAX_DESCRIPTION_LEN)
    {
        return Err(EngineError::OutOfRange("description too long".into()));
    }

    Ok(ValidatedRequest {
        span,
        category,
        hall,
    })
}

pub(crate) fn validate_remarks(remarks: Option<&str>) -> Result<(), EngineError> {
    if remarks.is_some_and(|r| r.len() > MAX_REMARKS_LEN) {
        return Err(EngineError::OutOfRange("remarks too long".into()));
    }
    Ok(())
}
