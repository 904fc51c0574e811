//! The templated reply used when the model stalls on the catalog.

use pathcoach_core::pathway::PathwayCatalog;

const EXAMPLE_PATHWAY: &str = "stress-checkin";

/// Invite the user to pick one of the catalog's pathways.
///
/// Pure and deterministic: the same user and catalog always give the same
/// text, one `- {title} (id: {pathwayId})` line per pathway in catalog order.
pub fn synthesize_reply(user_id: &str, catalog: &PathwayCatalog) -> String {
    let entries = catalog
        .pathways
        .iter()
        .map(|p| format!("- {} (id: {})", p.label(), p.pathway_id))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "No veo progreso previo para \"{user_id}\". Elige una ruta para empezar:\n{entries}\n\n\
         Escribe: \"empezar {{id}}\" (p. ej., empezar {EXAMPLE_PATHWAY}). Si prefieres, di \"recomiéndame\"."
    )
}
