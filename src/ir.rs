use crate::schema::ColumnRecord;
use std::collections::BTreeMap;

/// Which shared columns become relationship edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFilter {
    /// Every shared column links its tables.
    All,
    /// Only columns ending in `suffix` that appear in more than one table.
    SharedSuffix(&'static str),
}

impl ConnectionFilter {
    pub const KEY_SUFFIX: &'static str = "NO";

    pub fn from_limit(limit_connections: bool) -> Self {
        if limit_connections {
            Self::SharedSuffix(Self::KEY_SUFFIX)
        } else {
            Self::All
        }
    }

    fn admits(self, column: &str, table_count: usize) -> bool {
        match self {
            Self::All => true,
            Self::SharedSuffix(suffix) => {
                column.to_uppercase().ends_with(suffix) && table_count > 1
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphIR {
    pub nodes: Vec<TableNode>,
    pub edges: Vec<RelationshipEdge>,
}

#[derive(Debug, Clone)]
pub struct TableNode {
    pub name: String,
    pub columns: Vec<ColumnRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipEdge {
    pub from: String,
    pub to: String,
    pub column: String,
}

impl GraphIR {
    pub fn from_records(records: &[ColumnRecord], filter: ConnectionFilter) -> Self {
        let mut tables: BTreeMap<&str, Vec<ColumnRecord>> = BTreeMap::new();
        for r in records {
            tables.entry(r.table_name.as_str()).or_default().push(r.clone());
        }

        let nodes: Vec<TableNode> = tables
            .into_iter()
            .map(|(name, columns)| TableNode {
                name: name.to_string(),
                columns,
            })
            .collect();

        // column name -> distinct tables in first-encounter order; blank names never link
        let mut shared: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for r in records.iter().filter(|r| !r.column_name.is_empty()) {
            let owners = shared.entry(r.column_name.as_str()).or_default();
            if !owners.contains(&r.table_name.as_str()) {
                owners.push(r.table_name.as_str());
            }
        }

        let edges: Vec<RelationshipEdge> = shared
            .into_iter()
            .filter(|(column, owners)| filter.admits(column, owners.len()))
            .flat_map(|(column, owners)| {
                owners
                    .windows(2)
                    .map(|pair| RelationshipEdge {
                        from: pair[0].to_string(),
                        to: pair[1].to_string(),
                        column: column.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        GraphIR { nodes, edges }
    }
}
