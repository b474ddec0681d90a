// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Parser};

use nvm_upload::{
    Family, Image, Speed, StrategyRegistry, TargetEntry, TransferOptions, UploadError, Uploader,
    KEY_NVC1,
};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "nvm-upload", version)]
#[command(about = "Upload NanoVM programs to a target over a serial line")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyS0)
    #[arg(value_name = "DEVICE", required_unless_present = "list")]
    pub device: Option<String>,

    /// Line speed in baud, or a target name (e.g., asuro)
    #[arg(value_name = "SPEED|TARGET", required_unless_present = "list")]
    pub speed_or_target: Option<String>,

    /// Program image to upload
    #[arg(value_name = "FILE", required_unless_present = "list")]
    pub file: Option<PathBuf>,

    /// Upload protocol
    #[arg(short, long, default_value = KEY_NVC1)]
    pub protocol: String,

    /// Reply timeout in milliseconds (default depends on the protocol)
    #[arg(short, long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// List protocols and their targets, then exit
    #[arg(long)]
    pub list: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Second positional argument, before it is resolved against a protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSetting {
    Speed(Speed),
    Target(String),
}

/// Split `SPEED|TARGET` into a speed or a target name.
///
/// All digits is a speed (must be non-zero and fit in 32 bits). Anything else
/// starting with a digit is a malformed speed. The rest are target names.
pub fn parse_link_setting(arg: &str) -> std::result::Result<LinkSetting, UploadError> {
    if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
        let value: u32 = arg
            .parse()
            .map_err(|_| UploadError::Usage(format!("Speed '{}' is out of range", arg)))?;
        return Speed::new(value)
            .map(LinkSetting::Speed)
            .ok_or_else(|| UploadError::Usage("Speed must be greater than zero".to_string()));
    }

    if arg.is_empty() || arg.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(UploadError::Usage(format!(
            "Cannot parse '{}' as a speed or target name",
            arg
        )));
    }

    Ok(LinkSetting::Target(arg.to_string()))
}

/// Pick the target and line speed for `family`.
///
/// A bare speed addresses the family's default target; a target name uses
/// that target's default speed.
pub fn resolve(
    family: Family,
    setting: &LinkSetting,
) -> std::result::Result<(&'static TargetEntry, Speed), UploadError> {
    match setting {
        LinkSetting::Speed(speed) => Ok((family.default_target(), *speed)),
        LinkSetting::Target(name) => {
            let entry = family
                .lookup(name)
                .map_err(|e| UploadError::UnknownTarget {
                    family: e.family,
                    target: name.clone(),
                })?;
            Ok((entry, entry.default_speed))
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let options = TransferOptions {
        timeout: cli.timeout.map(Duration::from_millis),
        progress: !cli.no_progress,
    };
    let mut uploader = Uploader::new(StrategyRegistry::builtin(options));

    if cli.list {
        print_protocols(uploader.registry());
        return Ok(());
    }

    let (Some(device), Some(setting), Some(file)) = (cli.device, cli.speed_or_target, cli.file)
    else {
        return Err(UploadError::Usage(
            "DEVICE, SPEED|TARGET and FILE are required".to_string(),
        )
        .into());
    };

    // Everything that can be checked without I/O goes first.
    let setting = parse_link_setting(&setting)?;
    uploader.select(&cli.protocol)?;
    let family = uploader.current()?.family();
    let (target, speed) = resolve(family, &setting)?;

    let image = Image::load(&file)?;

    println!("Image:    {} ({} bytes)", file.display(), image.len());
    println!("Protocol: {}", cli.protocol);
    println!(
        "Target:   {} (id {}) at {} baud{}",
        target.name,
        target.id,
        target.effective_speed(speed),
        if target.fixed_speed { ", fixed" } else { "" }
    );
    println!();

    uploader.upload(&device, target.id, speed, &image)?;

    println!();
    println!("Program uploaded successfully!");
    Ok(())
}

fn print_protocols(registry: &StrategyRegistry) {
    println!("Available protocols:");
    for (key, strategy) in registry.iter() {
        println!("  {:8} - {}", key, strategy.description());
        for target in strategy.family().targets() {
            println!(
                "      {:8} id {:<3} {:>6} baud{}  {}",
                target.name,
                target.id.raw(),
                target.default_speed.get(),
                if target.fixed_speed { " (fixed)" } else { "        " },
                target.description
            );
        }
    }
}
