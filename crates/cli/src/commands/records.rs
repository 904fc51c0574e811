//! `pathcoach progress` and `pathcoach history`: Inspect stored records.

use pathcoach_core::progress::{ChatLog, ChatRole, ProgressStore};

use super::{load_config, open_store};

pub async fn progress(user: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let store = open_store(&config);

    let records = ProgressStore::list_by_user(&store, user).await?;
    if records.is_empty() {
        println!("No progress recorded for \"{user}\".");
        return Ok(());
    }

    println!("Progress for \"{user}\"");
    println!("===================");
    for record in records {
        let status = if record.completed { "completed" } else { "in progress" };
        println!(
            "  {:<24} step {:<3} {:<12} {} answers",
            record.pathway_id,
            record.current_step_index,
            status,
            record.responses.len()
        );
    }
    Ok(())
}

pub async fn history(user: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let config = load_config()?;
    let store = open_store(&config);

    let entries = ChatLog::list_by_user(&store, user, limit).await?;
    if entries.is_empty() {
        println!("No chat history for \"{user}\".");
        return Ok(());
    }

    for entry in entries {
        let who = match entry.role {
            ChatRole::User => "user",
            ChatRole::Bot => "bot ",
        };
        println!(
            "  {} {} > {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            who,
            entry.text
        );
    }
    Ok(())
}
