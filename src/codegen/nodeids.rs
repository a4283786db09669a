//! Numeric node ids published by the OPC Foundation.
//!
//! The source is a header-less CSV table `name,id,category`. Rows are bucketed
//! by category in source order; a fixed subset of categories becomes one
//! `enum class` each. Parsing is strict: a single malformed row aborts the run.

use crate::error::{GenError, GenResult};
use crate::template::FragmentRenderer;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_NODE_IDS_URL: &str = "http://www.opcfoundation.org/UA/schemas/1.04/NodeIds.csv";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Categories emitted as enumerations, in emission order.
pub const SELECTED_CATEGORIES: &[&str] = &[
    "DataType",
    "ReferenceType",
    "ObjectType",
    "VariableType",
    "Object",
    "Variable",
    "Method",
];

const ENUM_TEMPLATE: &str = r#"
/**
 * {{ category }} node ids defined by the OPC UA specification (generated).
 * @see https://reference.opcfoundation.org/Core/Part6/v105/docs/A.3
 * @ingroup NodeIds
 */
enum class {{ enum_name }} : uint32_t {
{% for record in records %}    {{ record.name }} = {{ record.id }},
{% endfor %}};
"#;

/// Doc group opening the generated namespace.
pub const NODE_IDS_PREAMBLE: &str = "/**
 * @defgroup NodeIds Generated NodeIds
 * Numeric NodeIds defined by the OPC UA specification.
 * @see https://reference.opcfoundation.org/Core/Part6/v105/docs/A.3
 */";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdRecord {
    pub name: String,
    pub id: u32,
    pub category: String,
}

/// Where the node id table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIdSource {
    Url { url: String, user_agent: String },
    File(PathBuf),
}

impl NodeIdSource {
    pub fn describe(&self) -> String {
        match self {
            NodeIdSource::Url { url, .. } => url.clone(),
            NodeIdSource::File(path) => path.display().to_string(),
        }
    }

    /// Retrieve the raw table text.
    pub async fn fetch(&self) -> GenResult<String> {
        match self {
            NodeIdSource::Url { url, user_agent } => fetch_table(url, user_agent).await,
            NodeIdSource::File(path) => {
                std::fs::read_to_string(path).map_err(|source| GenError::SchemaRead {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

pub async fn fetch_table(url: &str, user_agent: &str) -> GenResult<String> {
    let network = |reason: String| GenError::Network {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| network(format!("failed to build HTTP client: {e}")))?;

    tracing::info!(url, user_agent, "fetching node id table");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(network(format!("server answered {status}")));
    }

    response.text().await.map_err(|e| network(e.to_string()))
}

/// Rows grouped by category, both levels in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIdTable {
    categories: IndexMap<String, Vec<NodeIdRecord>>,
}

impl NodeIdTable {
    pub fn parse(content: &str) -> GenResult<Self> {
        let mut categories: IndexMap<String, Vec<NodeIdRecord>> = IndexMap::new();
        for (index, line) in content.lines().enumerate() {
            let record = parse_row(index + 1, line)?;
            categories
                .entry(record.category.clone())
                .or_default()
                .push(record);
        }
        Ok(Self { categories })
    }

    pub fn category(&self, name: &str) -> &[NodeIdRecord] {
        self.categories.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

fn parse_row(row: usize, line: &str) -> GenResult<NodeIdRecord> {
    let malformed = |reason: String| GenError::MalformedRow {
        row,
        line: line.to_string(),
        reason,
    };

    let columns: Vec<&str> = line.split(',').collect();
    let [name, id, category] = columns.as_slice() else {
        return Err(malformed(format!("expected 3 columns, found {}", columns.len())));
    };
    let id = id
        .parse::<u32>()
        .map_err(|e| malformed(format!("invalid id {id:?}: {e}")))?;

    Ok(NodeIdRecord {
        name: name.to_string(),
        id,
        category: category.to_string(),
    })
}

#[derive(Serialize)]
struct EnumContext<'a> {
    category: &'a str,
    enum_name: String,
    records: &'a [NodeIdRecord],
}

pub struct NodeIdRenderer {
    renderer: FragmentRenderer,
}

impl NodeIdRenderer {
    pub fn new() -> GenResult<Self> {
        Ok(Self {
            renderer: FragmentRenderer::new(&[("enum", ENUM_TEMPLATE)])?,
        })
    }

    /// One enumeration per selected category. Selected categories missing
    /// from the table still produce an (empty) enumeration.
    pub fn render(&self, table: &NodeIdTable) -> GenResult<Vec<String>> {
        SELECTED_CATEGORIES
            .iter()
            .map(|category| {
                let context = EnumContext {
                    category,
                    enum_name: format!("{category}Id"),
                    records: table.category(category),
                };
                self.renderer.render("enum", &context)
            })
            .collect()
    }
}
