// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Resource tag resolution through a paginated tagging service.
//!
//! The resolver maps a metric namespace to its resource-type filters, walks
//! the tagging service page by page and converts each page into
//! [`TagRecord`] values on blocking workers while the next page is fetched.
//! Workers own their output; the resolver merges them after joining, so no
//! collection is shared between tasks.

use async_trait::async_trait;
use masterror::AppError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, tag_service_error},
    namespace::resource_type_filters,
};

/// Default upper bound on pages fetched per resolution.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Single key/value tag attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,)]
pub struct Tag
{
    /// Tag key; not unique within a resource.
    pub key:   String,
    /// Tag value, possibly empty.
    pub value: String,
}

/// Tags of one resource captured for correlation with its metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct TagRecord
{
    /// Opaque resource identifier, usually an ARN.
    pub id:        String,
    /// Namespace the resource was resolved for.
    pub namespace: String,
    /// Region the tagging session was scoped to.
    pub region:    String,
    /// Tags in service order; duplicate keys are kept.
    pub tags:      Vec<Tag,>,
}

impl TagRecord
{
    /// Returns the value of the first tag named `key`.
    pub fn tag_value(&self, key: &str,) -> Option<&str,>
    {
        self.tags.iter().find(|tag| tag.key == key,).map(|tag| tag.value.as_str(),)
    }
}

/// Request for one page of tagged resources.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct GetResourcesRequest
{
    /// Resource-type filter tokens, for example `ec2:instance`.
    pub resource_type_filters: Vec<String,>,
    /// Continuation token returned by the previous page.
    pub pagination_token:      Option<String,>,
}

/// Resource identifier and tags as returned by the tagging service.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ResourceTagMapping
{
    /// ARN of the tagged resource.
    pub resource_arn: String,
    /// Tags in the order the service returned them.
    pub tags:         Vec<Tag,>,
}

/// One page of the tagging service response.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ResourcePage
{
    /// Resources contained in the page.
    pub resource_tag_mappings: Vec<ResourceTagMapping,>,
    /// Token for the next page; `None` or empty on the last page.
    pub pagination_token:      Option<String,>,
}

/// Tagging service session scoped to a single region.
#[async_trait]
pub trait TaggingApi: Send + Sync
{
    /// Fetches one page of resources matching the request filters.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the call fails.
    async fn get_resources(&self, request: &GetResourcesRequest,)
    -> Result<ResourcePage, AppError,>;
}

/// Opens tagging sessions for a region.
pub trait TagSessionProvider: Send + Sync
{
    /// Session type produced by the provider.
    type Api: TaggingApi;

    /// Opens a session scoped to `region`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when credentials or session setup fail.
    fn open_session(&self, region: &str,) -> Result<Self::Api, AppError,>;
}

/// Resolves resource tags for metric namespaces.
///
/// # Example
///
/// ```no_run
/// use cloudwatching::{TagResolver, TagSessionProvider};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example<P: TagSessionProvider>(sessions: P) -> Result<(), cloudwatching::Error> {
/// let resolver = TagResolver::new(sessions,).with_max_pages(20,);
/// let records =
///     resolver.resolve_tags("AWS/EC2", "us-east-1", &CancellationToken::new(),).await?;
/// for record in records {
///     println!("{} has {} tags", record.id, record.tags.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone,)]
pub struct TagResolver<P,>
{
    sessions:  P,
    max_pages: usize,
}

impl<P: TagSessionProvider,> TagResolver<P,>
{
    /// Creates a resolver using [`DEFAULT_MAX_PAGES`] as the page bound.
    pub fn new(sessions: P,) -> Self
    {
        Self {
            sessions,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Overrides the page bound. Values below one are raised to one.
    pub fn with_max_pages(mut self, max_pages: usize,) -> Self
    {
        self.max_pages = max_pages.max(1,);
        self
    }

    /// Returns the configured page bound.
    pub fn max_pages(&self,) -> usize
    {
        self.max_pages
    }

    /// Collects the tags of every resource belonging to `namespace` in
    /// `region`.
    ///
    /// Pagination stops when the service reports no further page or when the
    /// page bound is reached; hitting the bound is a normal completion.
    /// Every resource of every fetched page appears exactly once in the
    /// result. Order is unspecified.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedNamespace`] when the namespace has no mapping;
    ///   the tagging service is not contacted.
    /// * [`Error::TagService`] when the session cannot be opened or a page
    ///   request fails. Nothing is retried.
    /// * [`Error::Cancelled`] when `cancel` fires before completion.
    pub async fn resolve_tags(
        &self,
        namespace: &str,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TagRecord,>, Error,>
    {
        let filters = resource_type_filters(namespace,)?;
        let api = self
            .sessions
            .open_session(region,)
            .map_err(|source| tag_service_error(namespace, region, source,),)?;
        debug!("Opened tagging session in {} for {} ({})", region, namespace, filters.join(", "));

        let mut request = GetResourcesRequest {
            resource_type_filters: filters.iter().map(|filter| (*filter).to_owned(),).collect(),
            pagination_token:      None,
        };
        let mut workers = JoinSet::new();
        let mut page_number = 0usize;

        loop {
            let page = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(cancelled(namespace, region, &mut workers,),);
                }
                page = api.get_resources(&request,) => {
                    page.map_err(|source| tag_service_error(namespace, region, source,),)?
                }
            };
            page_number += 1;

            let next_token = page.pagination_token.filter(|token| !token.is_empty(),);
            let mappings = page.resource_tag_mappings;
            debug!("Fetched page {} of {} with {} resources", page_number, namespace, mappings.len());

            let (worker_namespace, worker_region,) = (namespace.to_owned(), region.to_owned(),);
            workers.spawn_blocking(move || {
                (page_number, build_records(&worker_namespace, &worker_region, mappings,),)
            },);

            match next_token {
                None => break,
                Some(_,) if page_number >= self.max_pages => {
                    info!(
                        "Stopped tag resolution for {} after {} pages (page bound reached)",
                        namespace, page_number
                    );
                    break;
                }
                Some(token,) => request.pagination_token = Some(token,),
            }
        }

        let mut records = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(cancelled(namespace, region, &mut workers,),);
                }
                joined = workers.join_next() => joined,
            };
            let Some(joined,) = joined else {
                break;
            };
            let (page, page_records,) = joined.map_err(|error| {
                tag_service_error(
                    namespace,
                    region,
                    AppError::service(format!("tag record worker failed: {error}"),),
                )
            },)?;
            debug!("Page {} of {} produced {} tag records", page, namespace, page_records.len());
            records.extend(page_records,);
        }

        info!(
            "Resolved {} tag records for {} in {} across {} pages",
            records.len(),
            namespace,
            region,
            page_number
        );
        Ok(records,)
    }
}

fn build_records(namespace: &str, region: &str, mappings: Vec<ResourceTagMapping,>,)
-> Vec<TagRecord,>
{
    mappings
        .into_par_iter()
        .map(|mapping| TagRecord {
            id:        mapping.resource_arn,
            namespace: namespace.to_owned(),
            region:    region.to_owned(),
            tags:      mapping.tags,
        },)
        .collect()
}

fn cancelled<T: 'static,>(namespace: &str, region: &str, workers: &mut JoinSet<T,>,) -> Error
{
    warn!("Tag resolution for {} in {} cancelled", namespace, region);
    workers.abort_all();
    Error::Cancelled {
        namespace: namespace.to_owned(),
        region:    region.to_owned(),
    }
}
