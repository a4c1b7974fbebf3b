use anyhow::Result;

fn main() -> Result<()> {
    let doc = authgate::api::openapi();
    let json = doc.to_pretty_json()?;
    println!("{json}");
    Ok(())
}
