// Static command listing, in the original bot's style.

use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Exibe a lista de comandos do bot.
#[poise::command(slash_command, rename = "comandos")]
pub async fn comandos(ctx: Context<'_>) -> Result<(), Error> {
    let mut embed = serenity::CreateEmbed::new().color(serenity::Colour::from_rgb(255, 255, 0));

    for command in &ctx.framework().options().commands {
        let description = command
            .description
            .as_deref()
            .unwrap_or("Sem descrição.")
            .to_string();
        embed = embed.field(format!("`/{}`", command.name), description, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
