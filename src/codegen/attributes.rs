//! Read/write accessor declarations for node attributes.
//!
//! Every descriptor yields a read accessor pair (sync + async) and, when the
//! attribute is writeable, a write accessor pair. Output order is table order.

use crate::codegen::descriptor::{AttributeDescriptor, DescriptorTable};
use crate::error::GenResult;
use crate::template::FragmentRenderer;
use serde::Serialize;

const READ_TEMPLATE: &str = r#"
/**
 * Read the AttributeId::{{ attr }} attribute of a node.
 * {{ detail }}
 * @param connection {{ sync_connection_doc }}
 * @param id Node to read
 * @ingroup Read
 */
template <typename T>
inline Result<{{ read_type }}> read{{ attr }}({{ sync_connection }}, const NodeId& id) noexcept {
    return detail::readAttributeImpl<AttributeId::{{ attr }}>(connection, id);
}

/**
 * Asynchronously read the AttributeId::{{ attr }} attribute of a node.
 * @copydetails read{{ attr }}
 * @param token @completiontoken{void({{ read_token_type }})}
 * @return @asyncresult{Result<{{ read_type }}>}
 * @ingroup Read
 */
template <typename CompletionToken = DefaultCompletionToken>
inline auto read{{ attr }}Async(
    {{ async_connection }}, const NodeId& id, CompletionToken&& token = DefaultCompletionToken()
) {
    return detail::readAttributeAsyncImpl<AttributeId::{{ attr }}>(
        connection, id, std::forward<CompletionToken>(token)
    );
}
"#;

const WRITE_TEMPLATE: &str = r#"
/**
 * Write the AttributeId::{{ attr }} attribute of a node.
 * {{ detail }}
 * @param connection {{ sync_connection_doc }}
 * @param id Node to write
 * @param {{ param_name }} Value to write
 * @ingroup Write
 */
template <typename T>
inline StatusCode write{{ attr }}({{ sync_connection }}, const NodeId& id, {{ param_type }} {{ param_name }}) noexcept {
    return detail::writeAttributeImpl<AttributeId::{{ attr }}>(connection, id, {{ param_name }});
}

/**
 * Asynchronously write the AttributeId::{{ attr }} attribute of a node.
 * @copydetails write{{ attr }}
 * @param token @completiontoken{void(StatusCode)}
 * @return @asyncresult{StatusCode}
 * @ingroup Write
 */
template <typename CompletionToken = DefaultCompletionToken>
inline auto write{{ attr }}Async(
    {{ async_connection }},
    const NodeId& id,
    {{ param_type }} {{ param_name }},
    CompletionToken&& token = DefaultCompletionToken()
) {
    return detail::writeAttributeAsyncImpl<AttributeId::{{ attr }}>(
        connection, id, {{ param_name }}, std::forward<CompletionToken>(token)
    );
}
"#;

/// Connection handle an accessor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionParam {
    /// Generic `T&`: any handle that can read and write attributes
    /// (client or server).
    Any,
    /// Only the client handle supports asynchronous requests.
    Client,
}

impl ConnectionParam {
    pub fn declaration(self) -> &'static str {
        match self {
            ConnectionParam::Any => "T& connection",
            ConnectionParam::Client => "Client& connection",
        }
    }

    pub fn doc(self) -> &'static str {
        match self {
            ConnectionParam::Any => "Instance of type Client (or Server)",
            ConnectionParam::Client => "Instance of type Client",
        }
    }
}

/// Template variables for one descriptor.
#[derive(Debug, Serialize)]
struct AccessorContext {
    attr: &'static str,
    detail: &'static str,
    read_type: &'static str,
    read_token_type: String,
    param_type: String,
    param_name: String,
    sync_connection: &'static str,
    sync_connection_doc: &'static str,
    async_connection: &'static str,
}

impl AccessorContext {
    fn new(descriptor: &AttributeDescriptor) -> Self {
        Self {
            attr: descriptor.name,
            detail: descriptor.detail.unwrap_or_default(),
            read_type: descriptor.read_type(),
            read_token_type: descriptor.read_completion_type(),
            param_type: descriptor.write_param_type().into_owned(),
            param_name: descriptor.param_name(),
            sync_connection: ConnectionParam::Any.declaration(),
            sync_connection_doc: ConnectionParam::Any.doc(),
            async_connection: ConnectionParam::Client.declaration(),
        }
    }
}

pub struct AttributeRenderer {
    renderer: FragmentRenderer,
}

impl AttributeRenderer {
    pub fn new() -> GenResult<Self> {
        let renderer =
            FragmentRenderer::new(&[("read", READ_TEMPLATE), ("write", WRITE_TEMPLATE)])?;
        Ok(Self { renderer })
    }

    /// Fragments for one descriptor: read pair, then write pair if writeable.
    pub fn render_descriptor(&self, descriptor: &AttributeDescriptor) -> GenResult<Vec<String>> {
        let context = AccessorContext::new(descriptor);
        let mut fragments = vec![self.renderer.render("read", &context)?];
        if descriptor.writeable {
            fragments.push(self.renderer.render("write", &context)?);
        }
        Ok(fragments)
    }

    pub fn render(&self, table: &DescriptorTable<'_>) -> GenResult<Vec<String>> {
        let mut fragments = Vec::with_capacity(table.len() * 2);
        for descriptor in table.iter() {
            fragments.extend(self.render_descriptor(descriptor)?);
        }
        tracing::debug!(
            descriptors = table.len(),
            fragments = fragments.len(),
            "rendered attribute accessors"
        );
        Ok(fragments)
    }
}
