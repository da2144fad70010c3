//! osa schema - print the manifest JSON schema

use osa_common::api::manifest_schema;

use super::write_output;
use crate::Result;

pub async fn run() -> Result<()> {
    let mut json = serde_json::to_string_pretty(&manifest_schema())?;
    json.push('\n');
    write_output(None, json.as_bytes())
}
