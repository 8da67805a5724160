use anyhow::{Context, Result};

use crate::error::RegistryError;
use crate::registry::{CommandContext, CommandRegistry, Reply};

/// The sample commands the binary ships with, plus `help` listing all of them.
pub fn register_builtin_commands(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register("test", "A test command for a sample bot.", |_| {
        Ok(Reply::text("Hello, cruel VK API world! \n*sad face*"))
    })?;

    registry.register(
        "greeter",
        "Greets people. Usage: <prefix> greeter <name>",
        greeter,
    )?;

    registry.register(
        "shout",
        "Prints out a word in a fancy way. Usage: <prefix> shout <word>",
        shout,
    )?;

    // Registered last so the summary covers every command above.
    let summary = registry.usage_summary();
    registry.register("help", "Lists the available commands.", move |_| {
        Ok(Reply::text(format!("{}\nhelp - Lists the available commands.", summary)))
    })?;

    Ok(())
}

fn greeter(ctx: &CommandContext<'_>) -> Result<Reply> {
    let name = ctx.args.first().context("Usage: greeter <name>")?;
    Ok(Reply::text(format!("yo {}, appreciate ya!", name)))
}

/// `abc` becomes `A B C ` followed by `B` and `C` on their own lines.
fn shout(ctx: &CommandContext<'_>) -> Result<Reply> {
    let word = ctx.args.first().context("Usage: shout <word>")?.to_uppercase();
    let letters: Vec<char> = word.chars().collect();

    let mut out: String = letters.iter().map(|c| format!("{} ", c)).collect();
    for c in letters.iter().skip(1) {
        out.push('\n');
        out.push(*c);
    }
    Ok(Reply::text(out))
}
