//! Print the OpenAPI document to stdout.

use anyhow::Result;
use portico::api::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
