use std::fs;
use std::io::{self, Write};
use std::path::{Path as FsPath, PathBuf};
use std::process::exit;

use getopts::Options;
use log::debug;
use yaml_rust::{Yaml, YamlLoader};

use stache::error::Line;
use stache::scope::{Scope, Value};
use stache::Registry;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    let mut opts = Options::new();
    opts.optflag("h", "help", "Print this message");
    opts.optflag("i", "identity", "Render in identity mode, ignoring any data file");
    opts.reqopt("d", "dir", "Directory of .mustache template files to load", "PATH");
    opts.reqopt("t", "template", "Name of the template to render", "NAME");
    opts.optopt("f", "data", "Path to a YAML data file", "FILE");
    opts.optopt("o", "output", "Write output to FILE instead of stdout", "FILE");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            usage(&opts);
            eprintln!("{}", e);
            exit(1);
        }
    };

    if matches.opt_present("h") {
        usage(&opts);
        exit(0);
    }

    let dir = PathBuf::from(matches.opt_str("d").unwrap());
    if !dir.is_dir() {
        eprintln!("{}: not a directory", dir.display());
        exit(1);
    }

    let name = matches.opt_str("t").unwrap();
    let identity = matches.opt_present("i");

    let registry = match load_registry(&dir) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    let line = Line::new("<cli>", 0);
    let template = match registry.resolve(&name, &line) {
        Ok(template) => template,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    let output = if identity {
        template.render_identity()
    } else {
        let scope = match matches.opt_str("f") {
            Some(path) => match load_scope(&path) {
                Ok(scope) => scope,
                Err(e) => {
                    eprintln!("{}", e);
                    exit(1);
                }
            },
            None => Scope::new(),
        };
        match template.render(scope) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("{}", e);
                exit(1);
            }
        }
    };

    let result = match matches.opt_str("o") {
        Some(path) => fs::write(path, output),
        None => io::stdout().write_all(output.as_bytes()),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        exit(1);
    }
}

fn load_registry(dir: &FsPath) -> io::Result<Registry> {
    let mut registry = Registry::new();
    collect(dir, dir, &mut registry)?;
    Ok(registry)
}

fn collect(base: &FsPath, dir: &FsPath, registry: &mut Registry) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(base, &path, registry)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("mustache") {
            continue;
        }
        let relative = path.strip_prefix(base).unwrap_or(&path).with_extension("");
        let name = relative.to_string_lossy().replace('\\', "/");
        let source = fs::read_to_string(&path)?;
        debug!("registering template {} from {}", name, path.display());
        registry
            .insert(&name, &path.to_string_lossy(), &source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    }
    Ok(())
}

fn load_scope(path: &str) -> io::Result<Scope> {
    let source = fs::read_to_string(path)?;
    let mut docs = YamlLoader::load_from_str(&source)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let doc = docs.pop().unwrap_or(Yaml::Hash(Default::default()));
    Ok(yaml_to_scope(&doc))
}

fn yaml_to_scope(yaml: &Yaml) -> Scope {
    let mut scope = Scope::new();
    if let Yaml::Hash(ref map) = *yaml {
        for (key, value) in map {
            if let Yaml::String(ref key) = *key {
                scope.set(key.clone(), yaml_to_value(value));
            }
        }
    }
    scope
}

fn yaml_to_value(yaml: &Yaml) -> Value {
    match *yaml {
        Yaml::String(ref s) => Value::from(s.clone()),
        Yaml::Integer(n) => Value::Num(n as f64),
        Yaml::Real(ref s) => Value::Num(s.parse().unwrap_or(0.0)),
        Yaml::Boolean(b) => Value::Bool(b),
        Yaml::Array(ref items) => Value::List(items.iter().map(yaml_to_scope_item).collect()),
        Yaml::Hash(_) => Value::Map(yaml_to_scope(yaml)),
        Yaml::Null | Yaml::BadValue => Value::Null,
        _ => Value::Null,
    }
}

fn yaml_to_scope_item(yaml: &Yaml) -> Scope {
    match *yaml {
        Yaml::Hash(_) => yaml_to_scope(yaml),
        ref other => {
            let mut scope = Scope::new();
            scope.set(".", yaml_to_value(other));
            scope
        }
    }
}

fn usage(opts: &Options) {
    let brief = "Mustache template renderer\n\nUsage:\n    stache -d DIR -t NAME [-f DATA.yml] [-o OUTPUT]";
    println!("{}", opts.usage(&brief));
}
