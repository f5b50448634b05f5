/// One column of one table, as read from a schema export.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRecord {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub max_length: Option<i64>,
    pub key_type: KeyType,
    pub is_indexed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyType {
    Primary,
    Foreign,
    #[default]
    None,
}

impl KeyType {
    /// Expects already uppercased text.
    pub fn from_str(s: &str) -> Self {
        match s {
            "PRIMARY KEY" => Self::Primary,
            "FOREIGN KEY" => Self::Foreign,
            _ => Self::None,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Primary => "PK",
            Self::Foreign => "FK",
            Self::None => "",
        }
    }
}

impl ColumnRecord {
    /// Data type with the character limit appended, e.g. `VARCHAR(50)`.
    pub fn type_label(&self) -> String {
        match self.max_length {
            Some(n) => format!("{}({})", self.data_type, n),
            None => self.data_type.clone(),
        }
    }

    pub fn index_marker(&self) -> &'static str {
        if self.is_indexed { "TRUE" } else { "" }
    }
}
