//! Compile CloudWatch export configurations and resolve resource tags.
//!
//! The library turns loosely typed YAML export specifications into validated
//! [`ExportConfig`] values (compiled dimension filters, a closed
//! [`StatDefault`] policy, checked tag selection) and resolves the tags of
//! every resource behind a metric namespace through a paginated tagging
//! service. The export pipeline consuming both outputs lives outside this
//! crate; so does the transport behind [`TaggingApi`].

mod compiler;
mod config;
mod error;
mod namespace;
mod resolver;
pub mod retry;
mod tags;

pub use compiler::{
    CompiledConfiguration, Compiler, ExportCheck, ExportConfig, NoCheck, TaggableNamespaceCheck,
    compile, compile_document, load_configuration, parse_configuration,
};
pub use config::{
    ConfigDocument, RESOURCE_ID_DIMENSION, RESOURCE_TYPE_SELECTION, RawExportSpec, TagSelect,
};
pub use error::{Error, io_error, tag_service_error};
pub use namespace::{
    NamespaceResourceTypes, is_supported_namespace, resource_type_filters, supported_namespaces,
};
pub use resolver::{StatDefault, compile_patterns};
pub use tags::{
    DEFAULT_MAX_PAGES, GetResourcesRequest, ResourcePage, ResourceTagMapping, Tag, TagRecord,
    TagResolver, TagSessionProvider, TaggingApi,
};
