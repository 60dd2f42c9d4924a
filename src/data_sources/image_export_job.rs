//! `ibm_is_image_export_job`: a single export of an image to Cloud Object
//! Storage.

use serde::Serialize;

use super::{DataSource, required};
use crate::api::ImageExportJob;
use crate::api::types::{BucketReference, ObjectReference, StatusReason};
use crate::context::ProviderContext;
use crate::error::{Operation, Scope};
use crate::id::PairId;
use crate::resources::ProviderFuture;

/// Data source type name.
pub const DATA_SOURCE: &str = "ibm_is_image_export_job";

/// Lookup arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExportJobQuery {
    /// Image ID.
    pub image: String,
    /// Export job ID.
    pub image_export_job: String,
}

/// Result of the lookup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExportJobState {
    /// Composite `image/job` identifier.
    pub id: String,
    /// Image ID.
    pub image: String,
    /// Export job ID.
    pub image_export_job: String,
    /// Job name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Completion timestamp.
    pub completed_at: Option<String>,
    /// Start timestamp.
    pub started_at: Option<String>,
    /// Base64 wrapped data key, exactly as returned.
    pub encrypted_data_key: Option<String>,
    /// Export format.
    pub format: String,
    /// Canonical URL.
    pub href: String,
    /// Resource type label.
    pub resource_type: String,
    /// Job status.
    pub status: String,
    /// Reasons for the current status.
    pub status_reasons: Vec<StatusReason>,
    /// Target bucket.
    pub storage_bucket: Option<BucketReference>,
    /// Cloud Object Storage location.
    pub storage_href: String,
    /// Exported object.
    pub storage_object: Option<ObjectReference>,
}

impl ExportJobState {
    fn new(image: &str, job: ImageExportJob) -> Self {
        Self {
            id: PairId::new(image, job.id.as_str()).to_string(),
            image: image.to_owned(),
            image_export_job: job.id,
            name: job.name,
            created_at: job.created_at,
            completed_at: job.completed_at,
            started_at: job.started_at,
            encrypted_data_key: job.encrypted_data_key,
            format: job.format,
            href: job.href,
            resource_type: job.resource_type,
            status: job.status,
            status_reasons: job.status_reasons,
            storage_bucket: job.storage_bucket,
            storage_href: job.storage_href,
            storage_object: job.storage_object,
        }
    }
}

/// Looks up an image export job.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageExportJobDataSource;

impl DataSource for ImageExportJobDataSource {
    type Query = ExportJobQuery;
    type State = ExportJobState;

    const NAME: &'static str = DATA_SOURCE;

    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        query: &'a ExportJobQuery,
    ) -> ProviderFuture<'a, ExportJobState> {
        Box::pin(async move {
            let scope = Scope::new(DATA_SOURCE, Operation::Read);
            required("image", &query.image)
                .and_then(|()| required("image_export_job", &query.image_export_job))
                .map_err(|msg| scope.validation(msg))?;
            let job = ctx
                .vpc(scope)?
                .get_image_export_job(&query.image, &query.image_export_job)
                .await
                .map_err(|err| scope.remote("get_image_export_job", err))?;
            Ok(ExportJobState::new(&query.image, job))
        })
    }
}
