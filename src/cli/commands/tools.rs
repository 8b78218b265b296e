//! External tool check.

use console::style;

use crate::harvest::PopplerHarvester;

/// Report which Poppler tools are on PATH.
pub fn cmd_tools() {
    let tools = PopplerHarvester::check_tools();
    let missing = tools.iter().filter(|(_, found)| !found).count();

    for (name, found) in &tools {
        if *found {
            println!("{} {}", style("✓").green(), name);
        } else {
            println!("{} {} (not found)", style("✗").red(), name);
        }
    }

    if missing > 0 {
        println!(
            "\n{} PDF harvesting needs poppler-utils (apt install poppler-utils / brew install poppler)",
            style("!").yellow()
        );
    }
}
