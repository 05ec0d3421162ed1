//! Typed plant-care endpoints.
//!
//! Every call goes through `SessionController::fetch`, so a `401` from any of
//! them ends the session in one place.

use std::sync::Arc;

use super::transport::ApiRequest;
use super::types::{ApiError, CareEvent, Dashboard, NewCareEvent, NewPlant, NewSpecies, Plant, Species};
use crate::session::SessionController;

#[derive(Clone)]
pub struct PlantApi {
    session: Arc<SessionController>,
}

impl PlantApi {
    #[must_use]
    pub fn new(session: Arc<SessionController>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// `GET /dashboard`: the logged-in user and their plants.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; `AuthenticationExpired` has already ended the session.
    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.session.fetch(ApiRequest::get("/dashboard")).await
    }

    /// `GET /plants`
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn plants(&self) -> Result<Vec<Plant>, ApiError> {
        self.session.fetch(ApiRequest::get("/plants")).await
    }

    /// `POST /plants`
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a rejected body is `ValidationFailed`.
    pub async fn create_plant(&self, plant: &NewPlant) -> Result<Plant, ApiError> {
        self.session.fetch(ApiRequest::post("/plants").with_json(plant)?).await
    }

    /// `DELETE /plants/{id}`
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn delete_plant(&self, plant_id: i64) -> Result<(), ApiError> {
        self.session
            .fetch::<serde_json::Value>(ApiRequest::delete(format!("/plants/{plant_id}")))
            .await
            .map(|_| ())
    }

    /// `GET /species`
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn species(&self) -> Result<Vec<Species>, ApiError> {
        self.session.fetch(ApiRequest::get("/species")).await
    }

    /// `POST /species`
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn create_species(&self, species: &NewSpecies) -> Result<Species, ApiError> {
        self.session.fetch(ApiRequest::post("/species").with_json(species)?).await
    }

    /// `POST /plants/{id}/care_events`
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn add_care_event(&self, plant_id: i64, event: &NewCareEvent) -> Result<CareEvent, ApiError> {
        let request = ApiRequest::post(format!("/plants/{plant_id}/care_events")).with_json(event)?;
        self.session.fetch(request).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
