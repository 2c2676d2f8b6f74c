use anyhow::Context;
use trivia_board::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi();
    let json = doc
        .to_pretty_json()
        .context("serialising the OpenAPI document")?;
    println!("{json}");
    Ok(())
}
