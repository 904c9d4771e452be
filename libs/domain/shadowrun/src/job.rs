// [libs/domain/shadowrun/src/job.rs]
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ShadowRunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Created,
    Running,
    Succeeded,
    Failed,
}

/// Identity = (tenant, station, month, job_date, job_type); a unique
/// constraint on the tuple prevents duplicate enqueues (spec.md §3, §4.11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowJob {
    pub tenant_id: String,
    pub station_id: String,
    pub month: DateTime<Utc>,
    pub job_date: NaiveDate,
    pub job_type: String,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl ShadowJob {
    pub fn new(tenant_id: &str, station_id: &str, month: DateTime<Utc>, job_date: NaiveDate) -> Self {
        ShadowJob {
            tenant_id: tenant_id.to_string(),
            station_id: station_id.to_string(),
            month,
            job_date,
            job_type: "shadowrun".to_string(),
            status: JobStatus::Created,
            error: None,
        }
    }

    /// CREATED → RUNNING; rejects re-entry into an already-running job
    /// (spec.md §4.11 step 1).
    pub fn start(&self) -> Result<ShadowJob, ShadowRunError> {
        if self.status == JobStatus::Running {
            return Err(ShadowRunError::AlreadyRunning);
        }
        Ok(ShadowJob {
            status: JobStatus::Running,
            error: None,
            ..self.clone()
        })
    }

    pub fn succeed(&self) -> ShadowJob {
        ShadowJob {
            status: JobStatus::Succeeded,
            ..self.clone()
        }
    }

    /// FAILED leaves partial artifacts; the next run is a fresh `job_date`,
    /// so replay is safe (spec.md §4.11 step 8).
    pub fn fail(&self, error: &str) -> ShadowJob {
        ShadowJob {
            status: JobStatus::Failed,
            error: Some(error.to_string()),
            ..self.clone()
        }
    }
}
