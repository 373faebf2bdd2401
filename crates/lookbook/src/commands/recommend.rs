//! Recommend command - one photo in, ranked items out.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;
use lookbook_mcp::{RecommendationDriver, UploadedImage};

use super::Context;
use crate::view;

/// Arguments for the recommend command.
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Path to the outfit photo
    #[arg(required = true)]
    pub image: PathBuf,
}

/// Run the recommend command.
pub async fn run(args: RecommendArgs, ctx: &Context) -> Result<()> {
    let image = UploadedImage::from_path(&args.image)
        .await
        .with_context(|| format!("could not load {}", args.image.display()))?;

    let mut driver = RecommendationDriver::new(ctx.client()?);
    driver.select_image(image);

    let dim = Style::new().dim().for_stderr();
    let verbose = ctx.verbose && !ctx.json_output;
    if verbose {
        eprintln!(
            "{}",
            dim.apply_to(format!("Sending to: {}", driver.client().endpoint()))
        );
        eprintln!("{}", dim.apply_to(view::status_line(driver.view())));
    }

    let items = driver
        .submit_with(|snapshot| {
            if verbose {
                eprintln!(
                    "{}",
                    dim.apply_to(format!("[update: {} items]", snapshot.recommendations().len()))
                );
            }
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }

    println!();
    print!("{}", view::render_cards(items));
    println!();
    println!(
        "{}",
        Style::new().dim().apply_to(view::status_line(driver.view()))
    );

    Ok(())
}
