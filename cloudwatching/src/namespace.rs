// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Static mapping from metric namespaces to tagging resource-type filters.
//!
//! Some namespaces map to more than one filter because their metrics can be
//! attributed to several resource kinds. Application load balancer metrics,
//! for example, carry tags either on the load balancer or on the target
//! group.

use serde::Serialize;

use crate::error::Error;

/// Namespace identifiers paired with their resource-type filter tokens.
const NAMESPACE_RESOURCE_TYPES: &[(&str, &[&str],)] = &[
    ("AWS/EC2", &["ec2:instance",],),
    ("AWS/ECS-SVC", &["ecs:cluster", "ecs:service",],),
    ("AWS/ELB", &["elasticloadbalancing:loadbalancer",],),
    (
        "AWS/ApplicationELB",
        &["elasticloadbalancing:loadbalancer", "elasticloadbalancing:targetgroup",],
    ),
    ("AWS/NetworkELB", &["elasticloadbalancing:loadbalancer/net",],),
    ("AWS/VPN", &["ec2:vpn-connection",],),
    ("AWS/RDS", &["rds:db",],),
    ("AWS/ES", &["es:domain",],),
    ("AWS/EC", &["elasticache:cluster",],),
    ("AWS/S3", &["s3",],),
    ("AWS/EFS", &["elasticfilesystem:file-system",],),
    ("AWS/EBS", &["ec2:volume",],),
    ("AWS/Lambda", &["lambda:function",],),
    ("AWS/Kinesis", &["kinesis:stream",],),
    ("AWS/DynamoDB", &["dynamodb:table",],),
    ("AWS/EMR", &["elasticmapreduce:cluster",],),
    ("AWS/SQS", &["sqs",],),
];

/// One row of the namespace table, serialized by the `namespaces` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize,)]
pub struct NamespaceResourceTypes
{
    /// Metric namespace identifier.
    pub namespace:      &'static str,
    /// Resource-type filter tokens queried for the namespace.
    pub resource_types: &'static [&'static str],
}

/// Returns the resource-type filter tokens for `namespace`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedNamespace`] when the namespace has no
/// mapping. Callers decide whether that skips a single export or aborts the
/// batch.
///
/// # Examples
///
/// ```
/// use cloudwatching::resource_type_filters;
///
/// let filters = resource_type_filters("AWS/ApplicationELB",).unwrap();
/// assert_eq!(filters.len(), 2);
/// assert!(resource_type_filters("AWS/Unknown",).is_err());
/// ```
pub fn resource_type_filters(namespace: &str,) -> Result<&'static [&'static str], Error,>
{
    NAMESPACE_RESOURCE_TYPES
        .iter()
        .find(|(candidate, _,)| *candidate == namespace,)
        .map(|(_, filters,)| *filters,)
        .ok_or_else(|| Error::UnsupportedNamespace {
            namespace: namespace.to_owned(),
        },)
}

/// Returns `true` when `namespace` has a resource-type mapping.
pub fn is_supported_namespace(namespace: &str,) -> bool
{
    resource_type_filters(namespace,).is_ok()
}

/// Lists every supported namespace in table order.
pub fn supported_namespaces() -> impl Iterator<Item = NamespaceResourceTypes,>
{
    NAMESPACE_RESOURCE_TYPES.iter().map(|&(namespace, resource_types,)| NamespaceResourceTypes {
        namespace,
        resource_types,
    },)
}
