//! Reply extraction command: `forgechat extract`.

use anyhow::{Result, bail};
use std::path::Path;

use forgechat::extract::{extract_code_blocks, extract_project_manifest};

use super::{print_json, read_input};

pub fn cmd_extract(file: Option<&Path>, language: &str, manifest: bool, json: bool) -> Result<()> {
    let reply = read_input(file)?;

    if manifest {
        let Some(manifest) = extract_project_manifest(&reply) else {
            bail!("No project manifest found");
        };
        if json {
            print_json(&manifest)?;
        } else {
            println!("Project: {}", manifest.display_name());
            if !manifest.description.is_empty() {
                println!("Description: {}", manifest.description);
            }
            println!("Files:");
            for entry in &manifest.files {
                match entry.writable() {
                    Some((name, content)) => println!("  {} ({} bytes)", name, content.len()),
                    None => println!("  <incomplete entry>"),
                }
            }
        }
        return Ok(());
    }

    let blocks = extract_code_blocks(&reply, language);
    if json {
        print_json(&blocks)?;
    } else {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("# --- block {} ---", i + 1);
            println!("{}", block);
        }
    }
    Ok(())
}
