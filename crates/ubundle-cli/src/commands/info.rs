use anyhow::Context;
use serde_json::{Value, json};
use ubundle_formats::bundle::{BundleFile, BundleHeader};

use super::open_bundle;
use crate::output::{
    OutputStyle, create_table, format_count_badge, format_key_value, format_size, header_cell,
    numeric_cell, print_json, print_section_header, print_subsection_header, regular_cell,
};
use crate::{InfoArgs, OutputFormat};

pub fn handle(args: &InfoArgs, format: OutputFormat, no_color: bool) -> anyhow::Result<()> {
    let bundle = open_bundle(&args.bundle)?;

    match format {
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = info_json(&bundle, args.blocks)?;
            print_json(&value, format).context("failed to serialize bundle info")?;
        }
        OutputFormat::Text => print_text(&bundle, args, OutputStyle::new(no_color))?,
    }
    Ok(())
}

fn info_json(bundle: &BundleFile, with_blocks: bool) -> anyhow::Result<Value> {
    let header = bundle.header();
    let fs = header.fs_header();
    let info = bundle.blocks_info();

    let mut value = json!({
        "header": {
            "signature": header.signature(),
            "version": header.version(),
            "generation_version": header.generation_version(),
            "engine_version": header.engine_version(),
            "encryption_policy": header.policy().to_string(),
            "flags": fs.flags.bits(),
            "compression": header.compression()?.name(),
            "encrypted": header.is_encrypted(),
            "blocks_info_at_end": fs.flags.blocks_info_at_end(),
            "block_info_padding": header.block_info_need_padding_at_start(),
            "align_after_header": header.align_after_header(),
            "total_file_size": fs.total_file_size,
            "compressed_blocks_info_size": fs.compressed_size,
            "uncompressed_blocks_info_size": fs.decompressed_size,
        },
        "offsets": {
            "directory": header.directory_offset()?,
            "file_data": header.file_data_offset()?,
        },
        "blocks_info": {
            "hash": hex::encode(info.hash),
            "block_count": info.blocks.len(),
            "compressed_size": info.total_compressed_size(),
            "uncompressed_size": info.total_uncompressed_size(),
        },
        "directory": bundle.directory().iter().map(|entry| json!({
            "path": entry.path,
            "offset": entry.offset,
            "size": entry.size,
            "flags": entry.flags,
            "serialized_file": entry.is_serialized_file(),
        })).collect::<Vec<_>>(),
    });

    if with_blocks {
        let blocks = info
            .blocks
            .iter()
            .map(|block| {
                Ok(json!({
                    "compressed_size": block.compressed_size,
                    "uncompressed_size": block.uncompressed_size,
                    "compression": block.compression()?.name(),
                    "encrypted": block.is_encrypted(),
                }))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        value["blocks"] = Value::Array(blocks);
    }
    Ok(value)
}

fn print_header(header: &BundleHeader, style: OutputStyle) -> anyhow::Result<()> {
    let fs = header.fs_header();
    let engine = header.parsed_engine_version();

    print_subsection_header("Header", style);
    println!("{}", format_key_value("Signature", header.signature(), style));
    println!(
        "{}",
        format_key_value("Format Version", &header.version().to_string(), style)
    );
    println!(
        "{}",
        format_key_value("Generator", header.generation_version(), style)
    );
    println!(
        "{}",
        format_key_value(
            "Engine Version",
            &format!("{} (parsed {engine})", header.engine_version()),
            style
        )
    );
    println!(
        "{}",
        format_key_value("Encryption Policy", &header.policy().to_string(), style)
    );
    println!("{}", format_key_value("Flags", &fs.flags.to_string(), style));
    println!(
        "{}",
        format_key_value("Blocks Info Compression", header.compression()?.name(), style)
    );
    println!(
        "{}",
        format_key_value("Encrypted", &header.is_encrypted().to_string(), style)
    );
    println!(
        "{}",
        format_key_value(
            "Blocks Info At End",
            &fs.flags.blocks_info_at_end().to_string(),
            style
        )
    );
    println!(
        "{}",
        format_key_value(
            "Total Size",
            &format_size(fs.total_file_size.max(0) as u64),
            style
        )
    );

    print_subsection_header("Offsets", style);
    let directory = header
        .directory_offset()?
        .map_or_else(|| "none".to_string(), |offset| format!("0x{offset:X}"));
    println!("{}", format_key_value("Directory", &directory, style));
    println!(
        "{}",
        format_key_value(
            "File Data",
            &format!("0x{:X}", header.file_data_offset()?),
            style
        )
    );
    Ok(())
}

fn print_text(bundle: &BundleFile, args: &InfoArgs, style: OutputStyle) -> anyhow::Result<()> {
    let info = bundle.blocks_info();

    print_section_header(
        &format!("Bundle: {}", args.bundle.bundle.display()),
        style,
    );
    print_header(bundle.header(), style)?;

    print_subsection_header(
        &format!(
            "Storage Blocks {}",
            format_count_badge(info.blocks.len(), "block", "blocks", style)
        ),
        style,
    );
    println!(
        "{}",
        format_key_value(
            "Compressed",
            &format_size(info.total_compressed_size()),
            style
        )
    );
    println!(
        "{}",
        format_key_value(
            "Uncompressed",
            &format_size(info.total_uncompressed_size()),
            style
        )
    );

    if args.blocks {
        let mut table = create_table(style);
        table.set_header(vec![
            header_cell("#", style),
            header_cell("Compressed", style),
            header_cell("Uncompressed", style),
            header_cell("Compression", style),
            header_cell("Encrypted", style),
        ]);
        for (index, block) in info.blocks.iter().enumerate() {
            table.add_row(vec![
                numeric_cell(&index.to_string()),
                numeric_cell(&block.compressed_size.to_string()),
                numeric_cell(&block.uncompressed_size.to_string()),
                regular_cell(block.compression()?.name()),
                regular_cell(if block.is_encrypted() { "yes" } else { "no" }),
            ]);
        }
        println!("{table}");
    }

    print_subsection_header(
        &format!(
            "Directory {}",
            format_count_badge(bundle.directory().len(), "entry", "entries", style)
        ),
        style,
    );
    let mut table = create_table(style);
    table.set_header(vec![
        header_cell("Path", style),
        header_cell("Offset", style),
        header_cell("Size", style),
        header_cell("Flags", style),
    ]);
    for entry in bundle.directory() {
        table.add_row(vec![
            regular_cell(&entry.path),
            numeric_cell(&entry.offset.to_string()),
            numeric_cell(&entry.size.to_string()),
            numeric_cell(&format!("0x{:X}", entry.flags)),
        ]);
    }
    println!("{table}");
    Ok(())
}
