//! Accessor generation from the descriptor table.

use opcua_headergen::codegen::attributes::AttributeRenderer;
use opcua_headergen::codegen::descriptor::{ATTRIBUTES, AttributeDescriptor, DescriptorTable};
use opcua_headergen::codegen::output::HeaderSkeleton;

fn render(descriptors: &[AttributeDescriptor]) -> Vec<String> {
    let table = DescriptorTable::new(descriptors).unwrap();
    AttributeRenderer::new().unwrap().render(&table).unwrap()
}

// ============================================================================
// Worked example
// ============================================================================

#[test]
fn test_is_abstract_accessors() {
    let fragments = render(&[AttributeDescriptor::new("IsAbstract", "bool").copied()]);
    assert_eq!(fragments.len(), 2);

    let read = &fragments[0];
    assert!(read.contains("template <typename T>\ninline Result<bool> readIsAbstract(T& connection, const NodeId& id) noexcept {"));
    assert!(read.contains("return detail::readAttributeImpl<AttributeId::IsAbstract>(connection, id);"));
    assert!(read.contains("auto readIsAbstractAsync(\n    Client& connection, const NodeId& id, CompletionToken&& token = DefaultCompletionToken()\n) {"));
    assert!(read.contains("@completiontoken{void(Result<bool>)}"));
    assert!(read.contains(" * Asynchronously read the AttributeId::IsAbstract attribute of a node.\n * @copydetails readIsAbstract\n"));

    let write = &fragments[1];
    assert!(write.contains("StatusCode writeIsAbstract(T& connection, const NodeId& id, bool isAbstract) noexcept {"));
    assert!(write.contains("auto writeIsAbstractAsync("));
    assert!(write.contains("    bool isAbstract,\n    CompletionToken&& token = DefaultCompletionToken()\n"));
    assert!(write.contains("@completiontoken{void(StatusCode)}"));
    assert!(write.contains("template <typename T>\ninline StatusCode writeIsAbstract("));
    assert!(write.contains("inline auto writeIsAbstractAsync("));
    assert!(write.contains(" * @copydetails writeIsAbstract\n"));
}

// ============================================================================
// Writeable contract
// ============================================================================

#[test]
fn test_read_only_descriptors_have_no_write_accessors() {
    for descriptor in ATTRIBUTES.iter().filter(|d| !d.writeable) {
        let fragments = render(std::slice::from_ref(descriptor));
        let joined = fragments.join("\n");
        assert_eq!(fragments.len(), 1, "{}", descriptor.name);
        assert!(joined.contains(&format!("read{}(", descriptor.name)));
        assert!(joined.contains(&format!("read{}Async(", descriptor.name)));
        assert!(!joined.contains("StatusCode write"), "{}", descriptor.name);
    }
}

#[test]
fn test_full_table_fragment_count() {
    let writeable = ATTRIBUTES.iter().filter(|d| d.writeable).count();
    assert_eq!(render(ATTRIBUTES).len(), ATTRIBUTES.len() + writeable);
}

// ============================================================================
// Parameter types
// ============================================================================

#[test]
fn test_parameter_type_selection() {
    let by_ref = AttributeDescriptor::new("BrowseName", "QualifiedName");
    let by_value = AttributeDescriptor::new("Historizing", "bool").copied();
    let view = AttributeDescriptor::new("ArrayDimensions", "std::vector<uint32_t>")
        .copied()
        .with_view("Span<const uint32_t>");

    assert_eq!(by_ref.write_param_type(), "const QualifiedName&");
    assert_eq!(by_value.write_param_type(), "bool");
    assert_eq!(view.write_param_type(), "Span<const uint32_t>");

    let fragments = render(&[by_ref]);
    assert!(fragments[1].contains("const QualifiedName& browseName) noexcept"));
    assert!(fragments[0].contains("@completiontoken{void(Result<QualifiedName>&)}"));
}

// ============================================================================
// Ordering and assembly
// ============================================================================

#[test]
fn test_output_follows_table_order() {
    let fragments = render(ATTRIBUTES);
    let names: Vec<&str> = fragments
        .iter()
        .filter_map(|fragment| {
            let start = fragment.find("> read")? + "> read".len();
            let end = start + fragment[start..].find('(')?;
            Some(&fragment[start..end])
        })
        .collect();
    let expected: Vec<&str> = ATTRIBUTES.iter().map(|d| d.name).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_assembled_header_has_no_bare_doc_lines() {
    let skeleton = HeaderSkeleton::new("opcua::services")
        .include("\"open62541pp/services/attribute.hpp\"");
    let header = skeleton.assemble(&render(ATTRIBUTES));

    assert!(header.lines().all(|line| line.trim() != "*"));
    assert!(header.contains(" * Only defined for Method nodes.\n"));
    assert!(header.starts_with("/* ---"));
    assert!(header.ends_with("}  // namespace opcua::services\n"));
    assert_eq!(header.matches("#pragma once").count(), 1);
}

#[test]
fn test_rendering_is_deterministic() {
    assert_eq!(render(ATTRIBUTES), render(ATTRIBUTES));
}
