//! Sidebar command handler.

use anyhow::Result;

use crate::cli::context::AppContext;

pub async fn show(app: &AppContext) -> Result<()> {
    let data = app.client.sidebar().await?;
    let counts = data.visitor_counts;

    println!("Visitors  total {}  today {}  yesterday {}", counts.total, counts.today, counts.yesterday);
    if data.tags.is_empty() {
        println!("Tags      (none)");
    } else {
        println!("Tags      {}", data.tags.join(", "));
    }
    Ok(())
}
