use serde::Deserialize;

/// Options for turning XML input into a document tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOptions {
    /// Reject documents whose closing tags do not match their opening tags (default: true)
    #[serde(default = "default_true")]
    pub check_end_names: bool,

    /// Trim whitespace around text nodes while parsing (default: false)
    #[serde(default)]
    pub trim_text: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            check_end_names: true,
            trim_text: false,
        }
    }
}

/// Options for building a file summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOptions {
    /// IANA zone name for the local start date, e.g. "America/Denver"
    /// (default: the offset recorded in the file)
    #[serde(default)]
    pub time_zone: Option<String>,

    #[serde(flatten)]
    pub read: ReadOptions,
}

fn default_true() -> bool {
    true
}
