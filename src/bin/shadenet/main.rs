//! shadenet CLI - Inspect shading networks and resolve material terminals.

use std::env;
use std::process;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use shadenet::prelude::*;
use shadenet::shade::{resolve_all, SourceRef};

/// Default log filter per verbosity flag.
const LOG_QUIET: &str = "off";
const LOG_INFO: &str = "info";
const LOG_DEBUG: &str = "debug";
const LOG_TRACE: &str = "trace";

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = LOG_INFO;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = LOG_DEBUG,
            "-vv" | "--trace" => level = LOG_TRACE,
            "-q" | "--quiet" => level = LOG_QUIET,
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
    init_logging(if json_mode { LOG_QUIET } else { level });

    if let Err(e) = run(&filtered_args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the fmt subscriber. `SHADENET_LOG` wins over `RUST_LOG`, which
/// wins over the verbosity flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("SHADENET_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(args: &[&str]) -> Result<()> {
    let command = args[0];
    let opts = Options::parse(&args[1..])?;

    match command {
        "info" | "i" => cmd_info(opts.arg(0, "scene")?),
        "tree" | "t" => cmd_tree(opts.arg(0, "scene")?),
        "resolve" | "r" => cmd_resolve(opts.arg(0, "scene")?, opts.arg(1, "material")?, &opts),
        "resolve-all" | "ra" => cmd_resolve_all(opts.arg(0, "scene")?, &opts),
        "outputs" | "o" => cmd_outputs(opts.arg(0, "scene")?, opts.arg(1, "material")?),
        "base" | "b" => cmd_base(opts.arg(0, "scene")?, opts.arg(1, "material")?),
        "variants" | "vs" => cmd_variants(opts.arg(0, "scene")?, opts.arg(1, "prim")?),
        "master" | "m" => {
            let materials = opts.positional.get(3..).unwrap_or_default();
            if materials.is_empty() {
                bail!("missing material arguments\nUsage: shadenet master <scene.json> <out.json> <master> <material>... [-s set]");
            }
            cmd_master(opts.arg(0, "scene")?, opts.arg(1, "output")?, opts.arg(2, "master")?, materials, &opts)
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        "version" | "--version" => {
            print_version();
            Ok(())
        }
        other => {
            print_help();
            bail!("unknown command: {}", other)
        }
    }
}

fn print_help() {
    println!("shadenet - Shading network toolkit");
    println!();
    println!("USAGE:");
    println!("    shadenet [OPTIONS] <COMMAND> <scene.json> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i,  info        <scene>                       Show layers and prim counts");
    println!("    t,  tree        <scene>                       Show prim hierarchy with types");
    println!("    r,  resolve     <scene> <material>            Resolve a terminal to a shader output");
    println!("    ra, resolve-all <scene>                       Resolve a terminal on every material");
    println!("    o,  outputs     <scene> <material>            List terminal outputs and connections");
    println!("    b,  base        <scene> <material>            Show the base material chain");
    println!("    vs, variants    <scene> <prim>                Show variant sets and selections");
    println!("    m,  master      <scene> <out> <master> <mat>...  Build a master material variant set");
    println!("    h,  help                                      Show this help");
    println!("        version                                   Show build info");
    println!();
    println!("OPTIONS:");
    println!("    -t, --terminal <kind>   surface | displacement | volume (default: surface)");
    println!("    -c, --context <token>   Render context, repeat for priority order");
    println!("    -s, --set <name>        Variant set for 'master' (default: materialVariant)");
    println!("    -j, --json              JSON output");
    println!("    -v, --verbose           Show debug output");
    println!("    -vv, --trace            Show trace output (very verbose)");
    println!("    -q, --quiet             Suppress log output");
    println!();
    println!("EXAMPLES:");
    println!("    shadenet resolve looks.json /Looks/Wood -c mtl");
    println!("    shadenet resolve-all looks.json -t displacement --json");
    println!("    shadenet master looks.json out.json /Looks/Master /Looks/Wood /Looks/Glass");
    println!();
    println!("NOTES:");
    println!("    - The universal context is tried last unless given as -c \"\"");
    println!("    - SHADENET_LOG or RUST_LOG override the log filter");
}

fn version_line() -> String {
    format!(
        "shadenet {} ({} build, {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("SHADENET_BUILD_PROFILE").unwrap_or("unknown"),
        option_env!("SHADENET_BUILD_STAMP").unwrap_or("unknown"),
    )
}

fn print_version() {
    println!("{}", version_line());
}

/// Per-command options and positional arguments.
struct Options<'a> {
    positional: Vec<&'a str>,
    terminal: TerminalKind,
    contexts: Vec<&'a str>,
    set: Option<&'a str>,
    json: bool,
}

impl<'a> Options<'a> {
    fn parse(args: &[&'a str]) -> Result<Self> {
        let mut opts = Self {
            positional: Vec::new(),
            terminal: TerminalKind::Surface,
            contexts: Vec::new(),
            set: None,
            json: false,
        };
        let mut iter = args.iter().copied();
        while let Some(arg) = iter.next() {
            match arg {
                "-t" | "--terminal" => {
                    let v = iter.next().context("missing value for --terminal")?;
                    opts.terminal = v.parse()?;
                }
                "-c" | "--context" => opts.contexts.push(iter.next().context("missing value for --context")?),
                "-s" | "--set" => opts.set = Some(iter.next().context("missing value for --set")?),
                "-j" | "--json" => opts.json = true,
                _ => opts.positional.push(arg),
            }
        }
        Ok(opts)
    }

    fn arg(&self, index: usize, name: &str) -> Result<&'a str> {
        self.positional
            .get(index)
            .copied()
            .with_context(|| format!("missing {} argument", name))
    }
}

fn load(path: &str) -> Result<Stage> {
    Stage::load(path).with_context(|| format!("failed to load {}", path))
}

fn node_path(s: &str) -> Result<NodePath> {
    NodePath::parse(s).with_context(|| format!("bad prim path '{}'", s))
}

fn material<'a>(stage: &'a Stage, path: &str) -> Result<Material<'a>> {
    let path = node_path(path)?;
    Material::get(stage, &path).with_context(|| format!("{} is not a material", path))
}

fn cmd_info(path: &str) -> Result<()> {
    let stage = load(path)?;
    let prims = stage.traverse();
    debug!("traversed {} prims", prims.len());

    let count = |type_name: &str| {
        prims
            .iter()
            .filter(|p| stage.prim(p).is_some_and(|c| c.is_a(type_name)))
            .count()
    };

    println!("Scene: {}", path);
    println!("Layers:");
    for (i, id) in stage.layer_identifiers().iter().enumerate() {
        println!("  [{}] {}", i, id);
    }
    println!();
    println!("Prims:      {}", prims.len());
    println!("  Materials:  {}", count(MATERIAL_TYPE));
    println!("  NodeGraphs: {}", count(NODE_GRAPH_TYPE));
    println!("  Shaders:    {}", count(SHADER_TYPE));
    Ok(())
}

fn cmd_tree(path: &str) -> Result<()> {
    let stage = load(path)?;
    println!("/");
    print_tree(&stage, &NodePath::root(), 1);
    Ok(())
}

fn print_tree(stage: &Stage, path: &NodePath, depth: usize) {
    let indent = "  ".repeat(depth);
    for name in stage.children(path) {
        let Ok(child) = path.child(&name) else { continue };
        let Some(prim) = stage.prim(&child) else { continue };
        let type_str = prim.type_name.as_deref().unwrap_or("-");
        let selections: Vec<String> = prim
            .variant_sets
            .iter()
            .map(|s| format!("{}={}", s.name, s.selection.as_deref().unwrap_or("")))
            .collect();
        if selections.is_empty() {
            println!("{}{} [{}]", indent, name, type_str);
        } else {
            println!("{}{} [{}] {{{}}}", indent, name, type_str, selections.join(", "));
        }
        print_tree(stage, &child, depth + 1);
    }
}

fn cmd_resolve(path: &str, mat: &str, opts: &Options<'_>) -> Result<()> {
    let stage = load(path)?;
    let material = material(&stage, mat)?;
    info!("resolving {} on {} for {:?}", opts.terminal, material.path(), opts.contexts);

    let source = material.compute_source(opts.terminal, &opts.contexts);
    if opts.json {
        let value = serde_json::json!({
            "material": material.path(),
            "terminal": opts.terminal,
            "contexts": opts.contexts,
            "source": source.as_ref().map(SourceRef::from),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match source {
        Some(src) => println!(
            "{} {} -> {}.outputs:{} ({})",
            material.path(),
            opts.terminal,
            src.shader.path(),
            src.output_name,
            src.value_type
        ),
        None => println!("{} {} -> (none)", material.path(), opts.terminal),
    }
    Ok(())
}

fn cmd_resolve_all(path: &str, opts: &Options<'_>) -> Result<()> {
    let stage = load(path)?;
    let results = resolve_all(&stage, opts.terminal, &opts.contexts);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for r in &results {
        match &r.source {
            Some(s) => println!("{} -> {}.outputs:{} ({})", r.material, s.shader, s.output, s.value_type),
            None => println!("{} -> (none)", r.material),
        }
    }
    println!();
    let resolved = results.iter().filter(|r| r.source.is_some()).count();
    println!("Resolved {} of {} materials", resolved, results.len());
    Ok(())
}

fn cmd_outputs(path: &str, mat: &str) -> Result<()> {
    let stage = load(path)?;
    let material = material(&stage, mat)?;

    println!("Material: {}", material.path());
    for kind in TerminalKind::ALL {
        let outputs = material.terminal_outputs(kind);
        if outputs.is_empty() {
            continue;
        }
        println!("  {}:", kind);
        for out in outputs {
            let ctx = match out.render_context() {
                Some("") | None => "<universal>".to_string(),
                Some(c) => c.to_string(),
            };
            let sources = out.connected_sources();
            if sources.is_empty() {
                println!("    {:<14} (unconnected)", ctx);
            } else {
                let list: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
                println!("    {:<14} <- {}", ctx, list.join(", "));
            }
        }
    }
    Ok(())
}

fn cmd_base(path: &str, mat: &str) -> Result<()> {
    let stage = load(path)?;
    let material = material(&stage, mat)?;
    let chain = material.base_material_chain();

    if chain.is_empty() {
        println!("{} has no base material", material.path());
        return Ok(());
    }
    print!("{}", material.path());
    for base in &chain {
        print!(" -> {}", base.path());
    }
    println!();
    Ok(())
}

fn cmd_variants(path: &str, prim: &str) -> Result<()> {
    let stage = load(path)?;
    let prim_path = node_path(prim)?;
    let composed = stage.prim(&prim_path).with_context(|| format!("no prim at {}", prim_path))?;

    if composed.variant_sets.is_empty() {
        println!("{} has no variant sets", prim_path);
        return Ok(());
    }
    for set in &composed.variant_sets {
        println!("{}:", set.name);
        for v in &set.variants {
            let marker = if set.selection.as_deref() == Some(v.as_str()) { "*" } else { " " };
            println!("  {} {}", marker, v);
        }
    }
    Ok(())
}

fn cmd_master(path: &str, out: &str, master: &str, materials: &[&str], opts: &Options<'_>) -> Result<()> {
    let stage = load(path)?;
    let master_path = node_path(master)?;
    if !stage.has_prim(&master_path) {
        info!("defining master prim {}", master_path);
        stage.define_prim(&master_path, None)?;
    }

    let mats = materials
        .iter()
        .map(|m| material(&stage, m))
        .collect::<Result<Vec<_>>>()?;
    create_master_material_variant(&stage, &master_path, &mats, opts.set)?;
    stage.save(out).with_context(|| format!("failed to write {}", out))?;

    println!(
        "Wrote {} variants on {} to {}",
        mats.len(),
        master_path,
        out
    );
    Ok(())
}
