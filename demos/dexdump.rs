use std::env;
use std::error::Error;

use dexlens::{DexContainer, DexFile};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: dexdump <classes.dex | app.apk>");
        std::process::exit(1);
    }

    match process(&args[1]) {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Aborted due to error: {}", e);
            std::process::exit(1);
        }
    }
}

fn process(path: &str) -> Result<(), Box<dyn Error>> {
    if path.ends_with(".apk") || path.ends_with(".zip") {
        let container = DexContainer::open_file(path, false)?;
        println!(
            "{} dex entries{}",
            container.dex_names().len(),
            if container.is_multidex() {
                " (multidex)"
            } else {
                ""
            }
        );
        for name in container.dex_names() {
            println!("== {} ==", name);
            dump(&container.parse(name)?);
        }
        return Ok(());
    }

    dump(&DexFile::open_file(path)?);
    Ok(())
}

fn dump(dex: &DexFile) {
    let header = dex.header();
    println!(
        "dex version {}, {} bytes, {} endian",
        header.dex_version(),
        header.file_size,
        if header.is_little_endian() {
            "little"
        } else {
            "big"
        }
    );
    println!(
        "{} strings, {} types, {} protos, {} fields, {} methods, {} classes",
        dex.string_count(),
        dex.type_count(),
        dex.proto_count(),
        dex.field_count(),
        dex.method_count(),
        dex.class_def_count()
    );

    println!("-- map --");
    for entry in dex.map_entries() {
        println!(
            "  {:#06x} {:<36} {:>8} items at {:#010x}",
            entry.item_type, entry.name, entry.size, entry.offset
        );
    }

    println!("-- classes --");
    for class in dex.class_defs() {
        println!("  {}", class.declaration);
        if class.class_data_off == 0 {
            continue;
        }
        match dex.class_data(class.class_data_off) {
            Ok(data) => {
                for field in data.static_fields.iter().chain(&data.instance_fields) {
                    if let Some(item) = dex.get_field(field.field_idx) {
                        println!("    field  {}", item.display);
                    }
                }
                for method in data.direct_methods.iter().chain(&data.virtual_methods) {
                    if let Some(item) = dex.get_method(method.method_idx) {
                        let body = match &method.code {
                            Some(code) => format!("{} instruction bytes", code.instruction_byte_count()),
                            None => "abstract/native".to_string(),
                        };
                        println!("    method {} ({})", item.display, body);
                    }
                }
            }
            Err(e) => println!("    unreadable class data: {}", e),
        }
        if class.static_values_off != 0 {
            if let Ok(values) = dex.static_values(class.static_values_off) {
                let rendered: Vec<String> =
                    values.iter().map(|value| dex.render_value(value)).collect();
                println!("    static values: [{}]", rendered.join(", "));
            }
        }
    }
}
