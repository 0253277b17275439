//! Frame renderers.

use std::fmt::Write as _;
use std::io::{self, Write};

use super::consumer::View;

/// Draws a [`View`] somewhere.
///
/// Every call is a full redraw; renderers keep no diff state.
pub trait Renderer: Send {
    /// Renders one view.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the output cannot be written.
    fn render(&mut self, view: &View) -> io::Result<()>;
}

/// Plain-text block renderer.
///
/// Each view is formatted in full and written with a single `write_all`,
/// so two renderers sharing stdout never interleave within a block.
#[derive(Debug)]
pub struct TextRenderer<W> {
    out: W,
}

impl TextRenderer<io::Stdout> {
    /// Renderer writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TextRenderer<W> {
    /// Renderer writing to `out`.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats a view as a text block.
#[must_use]
pub fn format_view(view: &View) -> String {
    let steady = &view.steady;
    let mut block = String::new();
    let state = if view.playing { "playing" } else { "paused" };
    let _ = writeln!(
        block,
        "[{}] {}/{} {} ({state}, {})",
        view.title,
        steady.phase + 1,
        view.phases,
        steady.phase_name,
        view.speed
    );
    let _ = writeln!(block, "  status: {}", steady.status);
    if !steady.nodes.is_empty() {
        let nodes: Vec<String> = steady
            .nodes
            .iter()
            .map(|n| match &n.tone {
                Some(tone) => format!("{} ({tone})", n.label),
                None => n.label.clone(),
            })
            .collect();
        let _ = writeln!(block, "  active: {}", nodes.join(", "));
    }
    for edge in &steady.edges {
        let _ = writeln!(block, "  edge:   {} -> {} [{}]", edge.from, edge.to, edge.style);
    }
    for packet in &view.packets {
        let _ = writeln!(
            block,
            "  packet: {} {} -> {} ({}ms)",
            packet.label,
            packet.from,
            packet.to,
            packet.travel.as_millis()
        );
    }
    block
}

impl<W: Write + Send> Renderer for TextRenderer<W> {
    fn render(&mut self, view: &View) -> io::Result<()> {
        self.out.write_all(format_view(view).as_bytes())?;
        self.out.flush()
    }
}

/// One JSON object per view, newline-delimited.
#[derive(Debug)]
pub struct JsonRenderer<W> {
    out: W,
}

impl JsonRenderer<io::Stdout> {
    /// Renderer writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonRenderer<W> {
    /// Renderer writing to `out`.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Renderer for JsonRenderer<W> {
    fn render(&mut self, view: &View) -> io::Result<()> {
        let mut line = serde_json::to_string(view).map_err(io::Error::other)?;
        line.push('\n');
        self.out.write_all(line.as_bytes())?;
        self.out.flush()
    }
}

impl Renderer for Box<dyn Renderer> {
    fn render(&mut self, view: &View) -> io::Result<()> {
        (**self).render(view)
    }
}
