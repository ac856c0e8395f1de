use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kurbo::{Affine, Rect};

#[derive(Parser, Debug)]
#[command(name = "svgfx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene document to a PNG.
    Render(RenderArgs),
    /// Run a single filter over a PNG.
    Filter(FilterArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FilterArgs {
    /// Input filter JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Source graphic PNG.
    #[arg(long)]
    image: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Element bounding box `x,y,w,h` in pixels; defaults to the whole image.
    #[arg(long, value_parser = parse_bbox)]
    bbox: Option<Rect>,
}

fn parse_bbox(s: &str) -> Result<Rect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid bbox '{s}': {e}"))?;
    match parts[..] {
        [x, y, w, h] if w >= 0.0 && h >= 0.0 => Ok(Rect::new(x, y, x + w, y + h)),
        _ => Err(format!("bbox must be x,y,w,h with non-negative size, got '{s}'")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Filter(args) => cmd_filter(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))
}

fn assets_root(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let doc: svgfx::Document = read_json(&args.in_path, "document")?;
    doc.validate()?;

    let mut ctx =
        svgfx::DrawingCtx::for_document(&doc)?.with_assets_root(assets_root(&args.in_path));
    ctx.draw()?;
    let target = ctx.into_target();

    write_png(&args.out, &target)
}

fn cmd_filter(args: FilterArgs) -> anyhow::Result<()> {
    let filter: svgfx::FilterNode = read_json(&args.in_path, "filter")?;
    filter.validate()?;

    let src = image::open(&args.image)
        .with_context(|| format!("open image '{}'", args.image.display()))?
        .to_rgba8();
    let (w, h) = src.dimensions();
    let map = svgfx::ChannelMap::RGBA;
    let source = svgfx::ImageBuffer::from_straight_rgba(w, h, src.as_raw(), map)?;

    // The host document is empty; it only supplies the canvas and asset lookup.
    let doc = svgfx::Document {
        canvas: svgfx::scene::Canvas {
            width: w,
            height: h,
        },
        resources: Default::default(),
        root: svgfx::Node::group(Vec::new()),
    };
    let mut host = svgfx::DrawingCtx::new(&doc, w, h, map)?
        .with_assets_root(assets_root(&args.in_path));

    let rect = args
        .bbox
        .unwrap_or_else(|| Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));
    let bbox = svgfx::BoundingBox::with_rect(rect, Affine::IDENTITY);
    let out = svgfx::evaluate_filter(&filter, source.share(), &mut host, &bbox, map)?;

    write_png(&args.out, &out)
}

fn write_png(path: &Path, buf: &svgfx::ImageBuffer) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let rgba = buf.to_straight_rgba(svgfx::ChannelMap::RGBA);
    image::save_buffer_with_format(
        path,
        &rgba,
        buf.width(),
        buf.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;

    eprintln!("wrote {}", path.display());
    Ok(())
}
