//! Observation search parameters

use chcs_core::qualify_code;

use crate::error::ClientError;

/// Filters for an Observation search.
///
/// At least one of `patient_id` or `study_id` must be set; the server has
/// no cross-tenant listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationQuery {
    pub patient_id: Option<String>,
    pub study_id: Option<String>,
    /// Bare code or `system|code`; accepts a [`chcs_core::Code`]
    pub code: Option<String>,
}

impl ObservationQuery {
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self::default().patient(patient_id)
    }

    pub fn for_study(study_id: impl Into<String>) -> Self {
        Self::default().study(study_id)
    }

    pub fn patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn study(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// FHIR search parameters, or [`ClientError::CallerContract`] when
    /// neither a patient nor a study is given
    pub fn to_params(&self) -> Result<Vec<(String, String)>, ClientError> {
        let patient = non_empty(&self.patient_id);
        let study = non_empty(&self.study_id);

        if patient.is_none() && study.is_none() {
            return Err(ClientError::CallerContract(
                "must specify at least one of patient_id or study_id".into(),
            ));
        }

        let mut params = Vec::with_capacity(3);
        if let Some(study) = study {
            params.push(("_has:Group:member:_id".to_string(), study.to_string()));
        }
        if let Some(patient) = patient {
            params.push(("patient".to_string(), patient.to_string()));
        }
        if let Some(code) = non_empty(&self.code) {
            params.push(("code".to_string(), qualify_code(code)));
        }
        Ok(params)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
