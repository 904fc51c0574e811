//! `pathcoach advance`: Answer the current pathway step without the model.

use std::path::Path;

use pathcoach_agent::advance;

use super::{load_catalog, load_config, open_store};

pub async fn run(user: &str, pathways: &Path, answer: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let catalog = load_catalog(pathways)?;
    let store = open_store(&config);

    let step = advance(&store, user, &catalog, answer).await?;

    match (&step.pathway_id, step.completed) {
        (None, _) => println!("No pathway to advance for \"{user}\"."),
        (Some(id), true) => println!("Pathway {id} completed."),
        (Some(id), false) => {
            println!("[{id}]");
            println!("{}", step.next_question);
        }
    }

    Ok(())
}
