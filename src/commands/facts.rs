//! `tend facts` - show what providers are matched against

use anyhow::Result;

use crate::cli::FactArgs;
use crate::config::Config;
use crate::ui;

pub fn run(args: FactArgs) -> Result<()> {
    let config = Config::load()?;
    let facts = super::platform_facts(&config, &args)?;

    ui::header("Platform facts");
    for (name, value) in facts.iter() {
        ui::kv(name, value);
    }
    Ok(())
}
