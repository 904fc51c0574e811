//! `pathcoach pathways`: Show a pathway catalog.

use std::path::Path;

use pathcoach_core::pathway::PathwayCatalog;

use super::load_catalog;

pub fn run(file: &Path, id: Option<&str>) -> anyhow::Result<()> {
    let catalog = load_catalog(file)?;
    print!("{}", render(&catalog, id)?);
    Ok(())
}

fn render(catalog: &PathwayCatalog, id: Option<&str>) -> anyhow::Result<String> {
    let mut out = String::new();

    let Some(id) = id else {
        if catalog.is_empty() {
            out.push_str("No pathways in this catalog.\n");
        }
        for pathway in &catalog.pathways {
            out.push_str(&format!(
                "  {:<24} {} ({} steps)\n",
                pathway.pathway_id,
                pathway.label(),
                pathway.steps.len()
            ));
        }
        return Ok(out);
    };

    let pathway = catalog
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("Unknown pathway: {id}"))?;
    out.push_str(&format!("{} ({})\n", pathway.label(), pathway.pathway_id));
    for (i, step) in pathway.steps.iter().enumerate() {
        out.push_str(&format!("  {:>2}. [{}] {}\n", i + 1, step.id, step.question));
    }
    Ok(out)
}
