use std::cmp::Reverse;

use crate::model::*;
use crate::principal::PrincipalId;

use super::conflict;
use super::{Engine, EngineError};

impl Engine {
    pub async fn reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let resource_id = self
            .resource_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        guard.reservation(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Every decision taken on a reservation, oldest first.
    pub async fn decision_history(
        &self,
        id: ReservationId,
    ) -> Result<Vec<DecisionLogEntry>, EngineError> {
        let resource_id = self
            .resource_for_reservation(&id)
            .ok_or(EngineError::NotFound(id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        Ok(guard.history(&id))
    }

    /// Read-only view of the overlap checker.
    pub async fn find_conflict(
        &self,
        resource_id: &ResourceId,
        span: Span,
        statuses: &[Status],
        exclude: Option<ReservationId>,
    ) -> Option<Reservation> {
        let rs = self.get_resource(resource_id)?;
        let guard = rs.read().await;
        conflict::find_conflict(&guard, &span, statuses, exclude).cloned()
    }

    /// Reservations on a hall with a status in `statuses`, by window start.
    pub async fn reservations_for(
        &self,
        resource_id: &ResourceId,
        statuses: &[Status],
    ) -> Vec<Reservation> {
        let Some(rs) = self.get_resource(resource_id) else {
            return Vec::new();
        };
        let guard = rs.read().await;
        guard
            .reservations
            .iter()
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect()
    }

    pub async fn reservations_by_requester(&self, requester: &PrincipalId) -> Vec<Reservation> {
        let mut found = Vec::new();
        for rs in self.all_resources() {
            let guard = rs.read().await;
            found.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| r.requester_id == *requester)
                    .cloned(),
            );
        }
        found.sort_by_key(Reservation::creation_key);
        found
    }

    /// Pending reservations in review order: highest score first, override
    /// requests ahead at equal score, then oldest.
    pub async fn pending_queue(&self) -> Vec<Reservation> {
        let mut pending = Vec::new();
        for rs in self.all_resources() {
            let guard = rs.read().await;
            pending.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| r.status == Status::Pending)
                    .cloned(),
            );
        }
        pending.sort_by_key(|r| (Reverse(r.score.total), !r.is_override(), r.creation_key()));
        pending
    }

    fn all_resources(&self) -> Vec<super::SharedResourceState> {
        self.state.iter().map(|e| e.value().clone()).collect()
    }
}
